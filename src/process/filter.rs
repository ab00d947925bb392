// src/process/filter.rs
use super::header::Header;
use crate::grid::Cell;

const SUBTOTAL_MARKERS: &[&str] = &["total", "soma"];

/// Cells sitting under real (non-placeholder) header labels.
fn labelled_cells<'a>(headers: &'a [Header], row: &'a [Cell]) -> impl Iterator<Item = &'a Cell> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.placeholder)
        .filter_map(move |(idx, _)| row.get(idx))
}

pub fn is_blank_row(headers: &[Header], row: &[Cell]) -> bool {
    labelled_cells(headers, row).all(Cell::is_blank)
}

/// Subtotal / grand-total lines injected by the spreadsheet author.
pub fn is_subtotal_row(headers: &[Header], row: &[Cell]) -> bool {
    labelled_cells(headers, row).any(|c| {
        let lower = c.as_text().to_lowercase();
        SUBTOTAL_MARKERS.iter().any(|m| lower.contains(m))
    })
}

pub fn keep_row(headers: &[Header], row: &[Cell]) -> bool {
    !is_blank_row(headers, row) && !is_subtotal_row(headers, row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::header::build_headers;

    fn headers() -> Vec<Header> {
        build_headers(&[Cell::text("OP"), Cell::Empty, Cell::text("Descrição")])
    }

    #[test]
    fn blank_rows_are_dropped() {
        let h = headers();
        assert!(!keep_row(&h, &[]));
        assert!(!keep_row(&h, &[Cell::Empty, Cell::Empty, Cell::text("  ")]));
        // data only under a placeholder column still counts as blank
        assert!(!keep_row(&h, &[Cell::Empty, Cell::text("stray"), Cell::Empty]));
        assert!(keep_row(&h, &[Cell::text("1001"), Cell::Empty, Cell::Empty]));
    }

    #[test]
    fn totals_are_dropped() {
        let h = headers();
        assert!(!keep_row(&h, &[Cell::text("TOTAL GERAL"), Cell::Empty, Cell::Empty]));
        assert!(!keep_row(&h, &[Cell::Empty, Cell::Empty, Cell::text("Soma fevereiro")]));
        assert!(keep_row(&h, &[Cell::text("1001"), Cell::Empty, Cell::text("CA50 10mm")]));
    }
}

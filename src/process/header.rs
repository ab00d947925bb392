// src/process/header.rs
use crate::grid::{Cell, Grid};

/// One header label; blank labels become positional placeholders that no alias can match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub label: String,
    pub placeholder: bool,
}

/// Index of the first row, within `depth` rows, holding a cell equal to
/// `sentinel` (trimmed, case-insensitive).
pub fn find_header_row(grid: &Grid, sentinel: &str, depth: usize) -> Option<usize> {
    let wanted = sentinel.trim().to_uppercase();
    grid.rows().iter().take(depth).position(|row| {
        row.iter()
            .any(|c| c.as_text().trim().to_uppercase() == wanted)
    })
}

/// Same as [`find_header_row`] but falls back to row 0 when nothing matches.
pub fn locate_header_row(grid: &Grid, sentinel: &str, depth: usize) -> usize {
    find_header_row(grid, sentinel, depth).unwrap_or(0)
}

pub fn build_headers(row: &[Cell]) -> Vec<Header> {
    row.iter()
        .enumerate()
        .map(|(idx, c)| {
            let label = c.as_text().trim().to_string();
            if label.is_empty() {
                Header {
                    label: format!("Col_{}", idx),
                    placeholder: true,
                }
            } else {
                Header {
                    label,
                    placeholder: false,
                }
            }
        })
        .collect()
}

pub fn real_labels(headers: &[Header]) -> Vec<&str> {
    headers
        .iter()
        .filter(|h| !h.placeholder)
        .map(|h| h.label.as_str())
        .collect()
}

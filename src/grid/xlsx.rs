// src/grid/xlsx.rs
use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDateTime;
use std::{fs::File, io::BufReader, path::Path};
use tracing::debug;

use super::{Cell, Grid, GridSource};
use crate::process::date_parser::datetime_to_serial;

/// Spreadsheet on disk (xlsx/xls/ods), read through calamine.
pub struct XlsxWorkbook {
    inner: Sheets<BufReader<File>>,
}

impl XlsxWorkbook {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = open_workbook_auto(path)
            .with_context(|| format!("failed to open workbook {}", path.display()))?;
        Ok(Self { inner })
    }
}

impl GridSource for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Grid> {
        let range = self
            .inner
            .worksheet_range(name)
            .with_context(|| format!("failed to read sheet `{}`", name))?;

        // calamine ranges start at the first used cell; anchor them at A1
        let (row0, col0) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row0 as usize];
        rows.extend(range.rows().map(|r| {
            let mut cells = vec![Cell::Empty; col0 as usize];
            cells.extend(r.iter().map(data_to_cell));
            cells
        }));
        debug!(sheet = name, rows = rows.len(), "sheet loaded");
        Ok(Grid::new(rows))
    }
}

/// Date-formatted cells keep their serial so downstream date logic sees a number.
fn data_to_cell(d: &Data) -> Cell {
    match d {
        Data::Empty => Cell::Empty,
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => iso_to_serial(s)
            .map(Cell::Number)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

fn iso_to_serial(s: &str) -> Option<f64> {
    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(datetime_to_serial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calamine_values_map_to_cells() {
        assert_eq!(data_to_cell(&Data::Int(3)), Cell::Number(3.0));
        assert_eq!(data_to_cell(&Data::Float(1.5)), Cell::Number(1.5));
        assert_eq!(data_to_cell(&Data::String("  ".into())), Cell::Empty);
        assert_eq!(data_to_cell(&Data::String("OP".into())), Cell::text("OP"));
        assert_eq!(data_to_cell(&Data::Bool(true)), Cell::text("true"));
    }

    #[test]
    fn iso_datetime_becomes_serial() {
        let cell = data_to_cell(&Data::DateTimeIso("1970-01-02T12:00:00".into()));
        assert_eq!(cell, Cell::Number(25570.5));
        let bad = data_to_cell(&Data::DateTimeIso("not a date".into()));
        assert_eq!(bad, Cell::text("not a date"));
    }

    #[test]
    fn sheet_is_anchored_at_a1() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("energia.xlsx");
        let mut book = rust_xlsxwriter::Workbook::new();
        let sheet = book.add_worksheet().set_name("Produção")?;
        sheet.write_string(2, 1, "Data")?;
        sheet.write_string(2, 2, "Laminação (t)")?;
        sheet.write_number(3, 1, 45689.0)?;
        sheet.write_number(3, 2, 800.0)?;
        book.save(&path)?;

        let mut wb = XlsxWorkbook::open(&path)?;
        assert_eq!(wb.sheet_names(), vec!["Produção".to_string()]);
        let grid = wb.read_sheet("Produção")?;
        assert_eq!(grid.len(), 4);
        assert!(grid.row(0).map_or(true, |r| r.is_empty()));
        let header = grid.row(2).unwrap();
        assert_eq!(header[0], Cell::Empty);
        assert_eq!(header[1], Cell::text("Data"));
        let body = grid.row(3).unwrap();
        assert_eq!(body[1], Cell::Number(45689.0));
        assert_eq!(body[2], Cell::Number(800.0));
        Ok(())
    }

    #[test]
    fn missing_workbook_is_an_error() {
        assert!(XlsxWorkbook::open("/definitely/not/here.xlsx").is_err());
    }
}

// src/grid/mod.rs
use anyhow::{bail, Result};
use std::borrow::Cow;

pub mod xlsx;

pub use xlsx::XlsxWorkbook;

/// A single spreadsheet cell, reduced to the three shapes the engine cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

/// Longest leading `[+-]digits[.digits][e[+-]digits]` run, if it holds a digit.
fn numeric_prefix(s: &str) -> Option<&str> {
    let b = s.as_bytes();
    let digits = |mut i: usize| {
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let mut end = usize::from(matches!(b.first(), Some(b'+' | b'-')));
    let int_end = digits(end);
    let mut seen = int_end > end;
    end = int_end;
    if b.get(end) == Some(&b'.') {
        let frac_end = digits(end + 1);
        if seen || frac_end > end + 1 {
            seen |= frac_end > end + 1;
            end = frac_end;
        }
    }
    if !seen {
        return None;
    }
    if matches!(b.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(b.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    Some(&s[..end])
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(_) => false,
            Cell::Text(s) => s.trim().is_empty(),
        }
    }

    /// Display form: integral numbers without a fractional part, text untouched.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    Cow::Owned(format!("{}", *v as i64))
                } else {
                    Cow::Owned(v.to_string())
                }
            }
        }
    }

    /// Numbers pass through. Text has every `,` read as `.` and yields its
    /// leading number, so `"48,5 t"` is `48.5`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(v) if v.is_finite() => Some(*v),
            Cell::Number(_) => None,
            Cell::Text(s) => {
                let cleaned = s.trim().replace(',', ".");
                numeric_prefix(&cleaned)?
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
            }
        }
    }

    /// Only genuine numeric cells, never numeric-looking text.
    pub fn as_serial(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

/// Rectangular-ish block of cells as read from one sheet. Rows may be ragged;
/// missing trailing cells read as `Cell::Empty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<&[Cell]> {
        self.rows.get(idx).map(Vec::as_slice)
    }
}

/// Anything that can hand out sheets of cells by name.
pub trait GridSource {
    fn sheet_names(&self) -> Vec<String>;
    fn read_sheet(&mut self, name: &str) -> Result<Grid>;
}

/// Workbook held entirely in memory, sheets kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, Grid)>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>, grid: Grid) -> Self {
        self.sheets.push((name.into(), grid));
        self
    }
}

impl GridSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(n, _)| n.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Grid> {
        match self.sheets.iter().find(|(n, _)| n == name) {
            Some((_, grid)) => Ok(grid.clone()),
            None => bail!("sheet `{}` not found in workbook", name),
        }
    }
}

/// Picks the schedule sheet: exact (case-insensitive) preference first,
/// then a substring preference, then the first sheet.
pub fn select_sheet(names: &[String], exact: &[String], partial: &[String]) -> Option<String> {
    let exact_hit = names.iter().find(|name| {
        let lower = name.to_lowercase();
        exact.iter().any(|p| lower == p.to_lowercase())
    });
    if let Some(name) = exact_hit {
        return Some(name.clone());
    }

    let partial_hit = names.iter().find(|name| {
        let lower = name.to_lowercase();
        partial.iter().any(|p| lower.contains(&p.to_lowercase()))
    });
    if let Some(name) = partial_hit {
        return Some(name.clone());
    }

    names.first().cloned()
}

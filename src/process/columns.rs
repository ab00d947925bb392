// src/process/columns.rs
use std::{collections::HashMap, hash::Hash};

use super::header::Header;
use crate::grid::Cell;

/// Ranked alias lookup: for each semantic field, the header labels that may
/// carry it, in preference order.
#[derive(Debug, Clone)]
pub struct AliasTable<F> {
    entries: Vec<(F, Vec<String>)>,
}

impl<F> Default for AliasTable<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: Copy + Eq + Hash> AliasTable<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: F, aliases: &[&str]) -> Self {
        self.extend(field, aliases.iter().map(|s| s.to_string()));
        self
    }

    /// Appends aliases after the ones already registered for `field`.
    pub fn extend(&mut self, field: F, aliases: impl IntoIterator<Item = String>) {
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, list)) => list.extend(aliases),
            None => self.entries.push((field, aliases.into_iter().collect())),
        }
    }

    pub fn aliases(&self, field: F) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = F> + '_ {
        self.entries.iter().map(|(f, _)| *f)
    }
}

/// Column indices bound to each field for one concrete header row,
/// in alias preference order.
#[derive(Debug, Clone)]
pub struct ColumnMap<F> {
    bound: HashMap<F, Vec<usize>>,
}

impl<F: Copy + Eq + Hash> ColumnMap<F> {
    pub fn resolve(headers: &[Header], table: &AliasTable<F>) -> Self {
        // duplicate labels: the rightmost column wins
        let mut by_label: HashMap<&str, usize> = HashMap::new();
        for (idx, h) in headers.iter().enumerate() {
            if !h.placeholder {
                by_label.insert(h.label.as_str(), idx);
            }
        }

        let mut bound = HashMap::new();
        for field in table.fields() {
            let mut cols: Vec<usize> = Vec::new();
            for alias in table.aliases(field) {
                if let Some(&idx) = by_label.get(alias.as_str()) {
                    if !cols.contains(&idx) {
                        cols.push(idx);
                    }
                }
            }
            bound.insert(field, cols);
        }
        Self { bound }
    }

    pub fn columns(&self, field: F) -> &[usize] {
        self.bound.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_bound(&self, field: F) -> bool {
        !self.columns(field).is_empty()
    }

    /// First non-blank cell across the bound columns.
    pub fn cell<'a>(&self, row: &'a [Cell], field: F) -> Option<&'a Cell> {
        self.columns(field)
            .iter()
            .filter_map(|&idx| row.get(idx))
            .find(|c| !c.is_blank())
    }

    /// First bound value that parses as a number; 0 when none does.
    pub fn number(&self, row: &[Cell], field: F) -> f64 {
        self.columns(field)
            .iter()
            .filter_map(|&idx| row.get(idx))
            .find_map(Cell::as_number)
            .unwrap_or(0.0)
    }

    /// First non-blank value, trimmed; empty string when none.
    pub fn text(&self, row: &[Cell], field: F) -> String {
        self.cell(row, field)
            .map(|c| c.as_text().trim().to_string())
            .unwrap_or_default()
    }

    /// The first non-blank value, if it is a genuine numeric cell.
    pub fn serial(&self, row: &[Cell], field: F) -> Option<f64> {
        self.cell(row, field).and_then(Cell::as_serial)
    }

    /// Overwrites every column bound to `field`.
    pub fn set(&self, row: &mut Vec<Cell>, field: F, value: Cell) {
        for &idx in self.columns(field) {
            if row.len() <= idx {
                row.resize(idx + 1, Cell::Empty);
            }
            row[idx] = value.clone();
        }
    }
}

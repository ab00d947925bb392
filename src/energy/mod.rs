// src/energy/mod.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::grid::{Cell, Grid, GridSource};
use crate::process::columns::ColumnMap;
use crate::process::date_parser::serial_to_datetime;
use crate::process::header::{build_headers, find_header_row};
use crate::schema::fields::{energy_aliases, EnergyField as F};
use crate::schema::DailyEnergyRecord;

pub const PRODUCTION_SHEET: &str = "Produção";
pub const GAS_SHEET: &str = "Gás Natural";
pub const ENERGY_SHEET: &str = "Consumo Energia Elétrica";

const DATE_LABEL: &str = "Data";

type DayMap = BTreeMap<NaiveDate, DailyEnergyRecord>;

/// Calendar date of the serial in the `Data` column.
fn row_date(row: &[Cell], date_col: usize) -> Option<NaiveDate> {
    row.get(date_col)
        .and_then(Cell::as_serial)
        .filter(|s| *s > 0.0)
        .and_then(serial_to_datetime)
        .map(|t| t.date())
}

/// Rows below the `Data` header of one log sheet.
struct SheetBody<'a> {
    columns: ColumnMap<F>,
    date_col: usize,
    rows: &'a [Vec<Cell>],
}

/// Header-resolved body of one log sheet, or `None` when the sheet has no
/// `Data` header row. The date is read from the column holding `Data`.
fn sheet_body(grid: &Grid) -> Option<SheetBody<'_>> {
    let header_row = find_header_row(grid, DATE_LABEL, grid.len())?;
    let header = grid.row(header_row)?;
    let wanted = DATE_LABEL.to_uppercase();
    let date_col = header
        .iter()
        .position(|c| c.as_text().trim().to_uppercase() == wanted)?;
    let headers = build_headers(header);
    Some(SheetBody {
        columns: ColumnMap::resolve(&headers, &energy_aliases()),
        date_col,
        rows: &grid.rows()[header_row + 1..],
    })
}

/// Pass 1: one entry per production date.
pub fn merge_production(days: &mut DayMap, grid: &Grid) {
    let Some(SheetBody { columns: cols, date_col, rows }) = sheet_body(grid) else {
        warn!(sheet = PRODUCTION_SHEET, "no `Data` header row; skipping");
        return;
    };
    for row in rows {
        if let Some(date) = row_date(row, date_col) {
            days.insert(
                date,
                DailyEnergyRecord {
                    rolling_output: cols.number(row, F::RollingOutput),
                    tl02_output: cols.number(row, F::Tl02Output),
                    ..DailyEnergyRecord::new(date)
                },
            );
        }
    }
    debug!(days = days.len(), "merged production");
}

/// Pass 2: gas volumes and calorific value, existing dates only.
pub fn merge_gas(days: &mut DayMap, grid: &Grid) {
    let Some(SheetBody { columns: cols, date_col, rows }) = sheet_body(grid) else {
        warn!(sheet = GAS_SHEET, "no `Data` header row; skipping");
        return;
    };
    let mut updated = 0usize;
    for row in rows {
        let Some(entry) = row_date(row, date_col).and_then(|d| days.get_mut(&d)) else {
            continue;
        };
        entry.gas_tl01 = cols.number(row, F::GasTl01);
        entry.gas_tl02 = cols.number(row, F::GasTl02);
        entry.gas_calorific_value = Some(cols.number(row, F::GasCalorificValue));
        updated += 1;
    }
    debug!(updated, "merged gas");
}

/// Pass 3: net electric consumption, existing dates only.
pub fn merge_energy(days: &mut DayMap, grid: &Grid) {
    let Some(SheetBody { columns: cols, date_col, rows }) = sheet_body(grid) else {
        warn!(sheet = ENERGY_SHEET, "no `Data` header row; skipping");
        return;
    };
    let mut updated = 0usize;
    for row in rows {
        let Some(entry) = row_date(row, date_col).and_then(|d| days.get_mut(&d)) else {
            continue;
        };
        entry.energy_total = cols.number(row, F::SwitchgearInput)
            - cols.number(row, F::WaterPlant)
            - cols.number(row, F::OverheadCrane);
        updated += 1;
    }
    debug!(updated, "merged energy");
}

fn has_activity(day: &DailyEnergyRecord) -> bool {
    day.rolling_output > 0.0 || day.gas_tl01 > 0.0 || day.energy_total != 0.0
}

fn read_optional<S: GridSource>(source: &mut S, name: &str) -> Result<Option<Grid>> {
    if !source.sheet_names().iter().any(|n| n == name) {
        warn!(sheet = name, "sheet missing; skipping");
        return Ok(None);
    }
    source
        .read_sheet(name)
        .map(Some)
        .with_context(|| format!("reading sheet `{}`", name))
}

/// Joins the production, gas and energy sheets by date, production first.
/// Days without any activity are dropped; output is ordered by date.
#[instrument(level = "info", skip(source))]
pub fn build_energy_log<S: GridSource>(source: &mut S) -> Result<Vec<DailyEnergyRecord>> {
    let mut days = DayMap::new();
    if let Some(grid) = read_optional(source, PRODUCTION_SHEET)? {
        merge_production(&mut days, &grid);
    }
    if let Some(grid) = read_optional(source, GAS_SHEET)? {
        merge_gas(&mut days, &grid);
    }
    if let Some(grid) = read_optional(source, ENERGY_SHEET)? {
        merge_energy(&mut days, &grid);
    }

    let total = days.len();
    let out: Vec<DailyEnergyRecord> = days.into_values().filter(has_activity).collect();
    info!(days = total, kept = out.len(), "energy log assembled");
    Ok(out)
}

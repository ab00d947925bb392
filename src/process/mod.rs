// src/process/mod.rs
pub mod classify;
pub mod columns;
pub mod date_parser;
pub mod dedup;
pub mod filter;
pub mod header;
pub mod month;
pub mod normalize;
pub mod provenance;
pub mod reconcile;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::grid::{select_sheet, Cell, Grid, GridSource};
use crate::schema::fields::ScheduleField;
use crate::schema::ScheduleRecord;
use classify::{classify, Decision};
use columns::ColumnMap;
use date_parser::plausible_datetime;
use month::{detect_reference_month, MonthVote};
use provenance::SourceMeta;
use reconcile::{reconcile_last_entry, Reconciliation};

/// Row counts after each stage of a schedule run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Rows below the header.
    pub data_rows: usize,
    /// Left after blank/subtotal filtering.
    pub filtered_rows: usize,
    pub in_month: usize,
    pub tolerance: usize,
    pub undated_kept: usize,
    pub dropped: usize,
    pub records: usize,
}

#[derive(Debug, Clone)]
pub struct ScheduleRun {
    pub header_row: usize,
    pub reference: Option<MonthVote>,
    /// `None` when no reference month could be inferred.
    pub reconciliation: Option<Reconciliation>,
    pub stats: RunStats,
    pub records: Vec<ScheduleRecord>,
}

impl ScheduleRun {
    pub fn total_planned(&self) -> f64 {
        self.records.iter().map(|r| r.planned_quantity).sum()
    }
}

/// Picks the schedule sheet (explicit name, or the configured preference
/// policy) and reads it.
pub fn read_schedule_sheet<S: GridSource>(
    source: &mut S,
    sheet: Option<&str>,
    cfg: &ScheduleConfig,
) -> Result<(String, Grid)> {
    let name = match sheet {
        Some(name) => name.to_string(),
        None => {
            let names = source.sheet_names();
            match select_sheet(&names, &cfg.sheet_exact, &cfg.sheet_partial) {
                Some(name) => name,
                None => bail!("workbook has no sheets"),
            }
        }
    };
    info!(sheet = %name, "using schedule sheet");
    let grid = source
        .read_sheet(&name)
        .with_context(|| format!("reading schedule sheet `{}`", name))?;
    Ok((name, grid))
}

/// Runs one schedule grid through header location, filtering, month
/// inference, classification, boundary reconciliation and normalization.
#[tracing::instrument(level = "info", skip(grid, cfg, source), fields(file = %source.file_name, rows = grid.len()))]
pub fn build_schedule(
    grid: &Grid,
    cfg: &ScheduleConfig,
    source: &SourceMeta,
    synced_at: DateTime<Utc>,
) -> Result<ScheduleRun> {
    if grid.is_empty() {
        bail!("schedule grid `{}` is empty", source.file_name);
    }

    let header_row = header::locate_header_row(grid, &cfg.header_sentinel, cfg.header_scan_depth);
    let headers = header::build_headers(grid.row(header_row).unwrap_or(&[]));
    let labels = header::real_labels(&headers);
    if labels.is_empty() {
        bail!("header row {} of `{}` has no labels", header_row, source.file_name);
    }
    info!(header_row, labels = ?labels, "located header row");

    let columns = ColumnMap::resolve(&headers, &cfg.alias_table());
    for field in [ScheduleField::StartDate, ScheduleField::PlannedQuantity] {
        if !columns.is_bound(field) {
            warn!(field = ?field, "no column matched");
        }
    }

    let mut stats = RunStats {
        data_rows: grid.len() - header_row - 1,
        ..RunStats::default()
    };
    let mut rows: Vec<Vec<Cell>> = grid.rows()[header_row + 1..]
        .iter()
        .filter(|r| filter::keep_row(&headers, r))
        .cloned()
        .collect();
    stats.filtered_rows = rows.len();
    debug!(
        data_rows = stats.data_rows,
        kept = stats.filtered_rows,
        "dropped blank and subtotal rows"
    );

    let start_of = |row: &[Cell]| {
        columns
            .serial(row, ScheduleField::StartDate)
            .and_then(|s| plausible_datetime(s, cfg.min_date_serial))
    };

    let reference = detect_reference_month(rows.iter().filter_map(|r| start_of(r)));
    let window = reference.as_ref().and_then(MonthVote::window);

    let reconciliation = match (&reference, window) {
        (Some(vote), Some(window)) => {
            if vote.tied {
                warn!(
                    year = vote.year,
                    month = vote.month,
                    count = vote.count,
                    buckets = ?vote.buckets,
                    "reference month tied; keeping the first month seen"
                );
            }
            info!(
                year = vote.year,
                month = vote.month,
                count = vote.count,
                "inferred reference month"
            );

            rows.retain(|row| {
                let decision = classify(
                    start_of(row),
                    &columns.text(row, ScheduleField::Description),
                    &columns.text(row, ScheduleField::OrderCode),
                    &window,
                    cfg,
                );
                match decision {
                    Decision::InMonth => stats.in_month += 1,
                    Decision::Tolerance => stats.tolerance += 1,
                    Decision::UndatedActivity => stats.undated_kept += 1,
                    _ => stats.dropped += 1,
                }
                decision.keep()
            });
            info!(
                in_month = stats.in_month,
                tolerance = stats.tolerance,
                undated = stats.undated_kept,
                dropped = stats.dropped,
                "classified rows"
            );

            Some(reconcile_last_entry(&mut rows, &columns, &window, cfg))
        }
        _ => {
            warn!("no valid start date; skipping month filter and reconciliation");
            None
        }
    };

    let adjustment = reconciliation.as_ref().and_then(Reconciliation::adjustment);
    let records: Vec<ScheduleRecord> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let adj = adjustment.as_ref().filter(|(i, _)| *i == idx).map(|(_, a)| a);
            normalize::normalize_row(row, &columns, adj, source, synced_at, cfg.min_date_serial)
        })
        .collect();
    stats.records = records.len();

    let run = ScheduleRun {
        header_row,
        reference,
        reconciliation,
        stats,
        records,
    };
    info!(
        records = run.stats.records,
        total_planned = %format!("{:.2}", run.total_planned()),
        "schedule normalized"
    );
    Ok(run)
}

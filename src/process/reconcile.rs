// src/process/reconcile.rs
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};

use super::columns::ColumnMap;
use super::date_parser::{datetime_to_serial, plausible_datetime};
use super::month::MonthWindow;
use crate::config::ScheduleConfig;
use crate::grid::Cell;
use crate::schema::fields::ScheduleField;

/// Pre-adjustment values of the one reconciled entry. Kept for audit display only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrimAdjustment {
    pub original_quantity: f64,
    pub original_end: NaiveDateTime,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// No in-scope row has a valid start.
    NoDatedRow,
    /// The last entry has no valid end to measure from.
    MissingEnd { row: usize },
    /// The last entry already ends on the month boundary.
    Aligned { row: usize },
    /// Original or target duration is not positive; nothing touched.
    NonPositive {
        row: usize,
        original: Duration,
        target: Duration,
    },
    Adjusted {
        row: usize,
        computed_ratio: f64,
        new_quantity: f64,
        adjustment: TrimAdjustment,
    },
}

impl Reconciliation {
    pub fn adjustment(&self) -> Option<(usize, TrimAdjustment)> {
        match self {
            Reconciliation::Adjusted {
                row, adjustment, ..
            } => Some((*row, *adjustment)),
            _ => None,
        }
    }
}

/// Upper bound on the ratio for a given base quantity.
pub fn ratio_cap(quantity: f64, cfg: &ScheduleConfig) -> f64 {
    if quantity < cfg.small_base_threshold {
        cfg.small_base_max_ratio
    } else {
        cfg.max_ratio
    }
}

/// `(computed, applied)` ratio of target to original duration, or `None`
/// when either duration is not positive.
pub fn proportional_ratio(
    original: Duration,
    target: Duration,
    quantity: f64,
    cfg: &ScheduleConfig,
) -> Option<(f64, f64)> {
    let orig_ms = original.num_milliseconds();
    let target_ms = target.num_milliseconds();
    if orig_ms <= 0 || target_ms <= 0 {
        return None;
    }
    let ratio = target_ms as f64 / orig_ms as f64;
    Some((ratio, ratio.min(ratio_cap(quantity, cfg))))
}

fn hours(d: Duration) -> f64 {
    d.num_seconds() as f64 / 3600.0
}

/// Stretches or trims the last dated entry (file order) so it ends on the
/// month's last instant, scaling its quantity by the same duration ratio.
pub fn reconcile_last_entry(
    rows: &mut [Vec<Cell>],
    columns: &ColumnMap<ScheduleField>,
    window: &MonthWindow,
    cfg: &ScheduleConfig,
) -> Reconciliation {
    let start_of = |row: &[Cell]| {
        columns
            .serial(row, ScheduleField::StartDate)
            .and_then(|s| plausible_datetime(s, cfg.min_date_serial))
    };

    let Some((idx, start)) = rows
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, r)| start_of(r).map(|t| (i, t)))
    else {
        return Reconciliation::NoDatedRow;
    };

    let row = &mut rows[idx];
    let Some(end) = columns
        .serial(row, ScheduleField::EndDate)
        .and_then(|s| plausible_datetime(s, cfg.min_date_serial))
    else {
        debug!(row = idx, "last entry has no valid end; skipping reconciliation");
        return Reconciliation::MissingEnd { row: idx };
    };

    if end == window.end {
        return Reconciliation::Aligned { row: idx };
    }

    let original = end - start;
    let target = window.end - start;
    let quantity = columns.number(row, ScheduleField::PlannedQuantity);

    let Some((computed, applied)) = proportional_ratio(original, target, quantity, cfg) else {
        debug!(
            row = idx,
            original_h = hours(original),
            target_h = hours(target),
            "non-positive duration; skipping reconciliation"
        );
        return Reconciliation::NonPositive {
            row: idx,
            original,
            target,
        };
    };

    let new_quantity = quantity * applied;
    let action = if applied > 1.0 { "extension" } else { "trimming" };
    info!(
        action,
        description = %columns.text(row, ScheduleField::Description),
        size = %columns.text(row, ScheduleField::SizeCode),
        original_h = %format!("{:.2}", hours(original)),
        target_h = %format!("{:.2}", hours(target)),
        ratio = %format!("{:.4}", computed),
        applied = %format!("{:.4}", applied),
        quantity_before = %format!("{:.2}", quantity),
        quantity_after = %format!("{:.2}", new_quantity),
        "reconciled last entry to month end"
    );

    let end_serial = Cell::Number(datetime_to_serial(window.end));
    columns.set(row, ScheduleField::PlannedQuantity, Cell::Number(new_quantity));
    columns.set(row, ScheduleField::EndDate, end_serial.clone());
    columns.set(row, ScheduleField::FinalEndDate, end_serial);

    Reconciliation::Adjusted {
        row: idx,
        computed_ratio: computed,
        new_quantity,
        adjustment: TrimAdjustment {
            original_quantity: quantity,
            original_end: end,
            ratio: applied,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::header::build_headers;
    use chrono::NaiveDate;

    fn feb_at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn columns() -> ColumnMap<ScheduleField> {
        let headers = build_headers(&[
            Cell::text("OP"),
            Cell::text("Início"),
            Cell::text("Término"),
            Cell::text("Qtde REAL (t)"),
            Cell::text("Prod. Acab. (t)"),
            Cell::text("Término Final"),
        ]);
        ColumnMap::resolve(&headers, &ScheduleConfig::default().alias_table())
    }

    fn row(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>, qty: f64) -> Vec<Cell> {
        let serial = |t: Option<NaiveDateTime>| {
            t.map(|t| Cell::Number(datetime_to_serial(t)))
                .unwrap_or(Cell::Empty)
        };
        vec![
            Cell::text("1001"),
            serial(start),
            serial(end),
            Cell::Number(qty),
            Cell::Number(qty),
            serial(end),
        ]
    }

    #[test]
    fn extends_last_entry_proportionally() {
        let cfg = ScheduleConfig::default();
        let window = MonthWindow::new(2025, 2).unwrap();
        let cols = columns();
        let mut rows = vec![
            row(Some(feb_at(26, 0, 0, 0)), Some(feb_at(27, 0, 0, 0)), 80.0),
            row(Some(feb_at(27, 0, 0, 0)), Some(feb_at(28, 12, 0, 0)), 50.0),
            row(None, None, 3.0),
        ];

        let out = reconcile_last_entry(&mut rows, &cols, &window, &cfg);
        let Reconciliation::Adjusted {
            row: idx,
            computed_ratio,
            new_quantity,
            adjustment,
        } = out
        else {
            panic!("expected adjustment, got {:?}", out);
        };
        assert_eq!(idx, 1);
        let expected = 172_799.0 / 129_600.0;
        assert!((computed_ratio - expected).abs() < 1e-9);
        assert!((new_quantity - 50.0 * expected).abs() < 1e-9);
        assert_eq!(adjustment.original_quantity, 50.0);
        assert_eq!(adjustment.original_end, feb_at(28, 12, 0, 0));

        // both quantity columns and both end columns rewritten
        assert_eq!(cols.number(&rows[1], ScheduleField::PlannedQuantity), new_quantity);
        assert_eq!(rows[1][4], Cell::Number(new_quantity));
        let end_serial = Cell::Number(datetime_to_serial(window.end));
        assert_eq!(rows[1][2], end_serial);
        assert_eq!(rows[1][5], end_serial);
        // earlier rows untouched
        assert_eq!(rows[0][3], Cell::Number(80.0));
    }

    #[test]
    fn trims_entry_running_past_month_end() {
        let cfg = ScheduleConfig::default();
        let window = MonthWindow::new(2025, 2).unwrap();
        let mut rows = vec![row(
            Some(feb_at(28, 0, 0, 0)),
            Some(feb_at(28, 0, 0, 0) + Duration::hours(48)),
            96.0,
        )];
        let out = reconcile_last_entry(&mut rows, &columns(), &window, &cfg);
        let (_, adj) = out.adjustment().expect("adjusted");
        assert!(adj.ratio < 1.0);
        assert!((adj.ratio - 86_399.0 / 172_800.0).abs() < 1e-9);
    }

    #[test]
    fn clamp_depends_on_base_quantity() {
        let cfg = ScheduleConfig::default();
        let one_hour = Duration::hours(1);
        let long = Duration::hours(1000);

        let (computed, applied) = proportional_ratio(one_hour, long, 10.0, &cfg).unwrap();
        assert_eq!(computed, 1000.0);
        assert_eq!(applied, 5.0);

        let (_, applied) = proportional_ratio(one_hour, long, 0.5, &cfg).unwrap();
        assert_eq!(applied, 100.0);

        let (_, applied) = proportional_ratio(one_hour, Duration::hours(3), 0.5, &cfg).unwrap();
        assert_eq!(applied, 3.0);
    }

    #[test]
    fn ratio_never_negative_or_above_cap() {
        let cfg = ScheduleConfig::default();
        for orig_h in [-5i64, 0, 1, 7, 48, 500] {
            for target_h in [-3i64, 0, 1, 24, 240, 10_000] {
                for qty in [0.0, 0.5, 1.0, 50.0] {
                    let got = proportional_ratio(
                        Duration::hours(orig_h),
                        Duration::hours(target_h),
                        qty,
                        &cfg,
                    );
                    match got {
                        Some((_, applied)) => {
                            assert!(orig_h > 0 && target_h > 0);
                            assert!(applied > 0.0);
                            assert!(applied <= ratio_cap(qty, &cfg));
                        }
                        None => assert!(orig_h <= 0 || target_h <= 0),
                    }
                }
            }
        }
    }

    #[test]
    fn non_positive_durations_are_skipped() {
        let cfg = ScheduleConfig::default();
        let window = MonthWindow::new(2025, 2).unwrap();
        // end before start
        let mut rows = vec![row(Some(feb_at(20, 0, 0, 0)), Some(feb_at(19, 0, 0, 0)), 10.0)];
        let before = rows.clone();
        let out = reconcile_last_entry(&mut rows, &columns(), &window, &cfg);
        assert!(matches!(out, Reconciliation::NonPositive { row: 0, .. }));
        assert_eq!(rows, before);
    }

    #[test]
    fn aligned_and_missing_end_are_no_ops() {
        let cfg = ScheduleConfig::default();
        let window = MonthWindow::new(2025, 2).unwrap();

        let mut rows = vec![row(Some(feb_at(27, 0, 0, 0)), Some(window.end), 10.0)];
        let out = reconcile_last_entry(&mut rows, &columns(), &window, &cfg);
        assert_eq!(out, Reconciliation::Aligned { row: 0 });

        let mut rows = vec![row(Some(feb_at(27, 0, 0, 0)), None, 10.0)];
        let out = reconcile_last_entry(&mut rows, &columns(), &window, &cfg);
        assert_eq!(out, Reconciliation::MissingEnd { row: 0 });

        let mut rows = vec![row(None, None, 10.0)];
        let out = reconcile_last_entry(&mut rows, &columns(), &window, &cfg);
        assert_eq!(out, Reconciliation::NoDatedRow);
    }

    #[test]
    fn picks_last_in_file_order_not_latest_start() {
        let cfg = ScheduleConfig::default();
        let window = MonthWindow::new(2025, 2).unwrap();
        let mut rows = vec![
            row(Some(feb_at(27, 0, 0, 0)), Some(feb_at(28, 0, 0, 0)), 10.0),
            row(Some(feb_at(10, 0, 0, 0)), Some(feb_at(11, 0, 0, 0)), 10.0),
        ];
        let out = reconcile_last_entry(&mut rows, &columns(), &window, &cfg);
        assert_eq!(out.adjustment().map(|(i, _)| i), Some(1));
        // 11 Feb → 28 Feb is far beyond 5x a one-day run
        assert_eq!(out.adjustment().map(|(_, a)| a.ratio), Some(5.0));
    }
}

// src/process/normalize.rs
use chrono::{DateTime, NaiveDate, Utc};

use super::columns::ColumnMap;
use super::date_parser::plausible_datetime;
use super::provenance::SourceMeta;
use super::reconcile::TrimAdjustment;
use crate::grid::Cell;
use crate::schema::fields::ScheduleField as F;
use crate::schema::ScheduleRecord;

/// Builds the canonical record for one in-scope row. Returns `None` when
/// the row carries neither a material code nor a size code.
pub fn normalize_row(
    row: &[Cell],
    columns: &ColumnMap<F>,
    adjustment: Option<&TrimAdjustment>,
    source: &SourceMeta,
    synced_at: DateTime<Utc>,
    min_serial: f64,
) -> Option<ScheduleRecord> {
    let text = |f| columns.text(row, f);
    let num = |f| columns.number(row, f);
    let date = |f| -> Option<NaiveDate> {
        columns
            .serial(row, f)
            .and_then(|s| plausible_datetime(s, min_serial))
            .map(|t| t.date())
    };

    let material_code = text(F::MaterialCode);
    let size_code = text(F::SizeCode);
    if material_code.is_empty() && size_code.is_empty() {
        return None;
    }

    Some(ScheduleRecord {
        material_code,
        order_code: text(F::OrderCode),
        description: text(F::Description),
        size_code,
        family: text(F::Family),

        start_date: date(F::StartDate),
        end_date: date(F::EndDate),
        final_end_date: date(F::FinalEndDate),
        weekday: text(F::Weekday),

        planned_quantity: num(F::PlannedQuantity),
        reported_quantity: num(F::ReportedQuantity),
        pieces: num(F::Pieces),
        linear_mass: num(F::LinearMass),
        real_vs_planned: num(F::RealVsPlanned),
        campaign_quantity: num(F::CampaignQuantity),

        productivity: num(F::Productivity),
        nominal_productivity: num(F::NominalProductivity),
        utilization_index: num(F::UtilizationIndex),
        efficiency_index: num(F::EfficiencyIndex),
        setup_minutes: num(F::SetupMinutes),
        delays_gains: num(F::DelaysGains),
        scheduled_stops: num(F::ScheduledStops),

        billets: num(F::Billets),
        steel_grade: text(F::SteelGrade),
        raw_material_code: text(F::RawMaterialCode),
        raw_material_description: text(F::RawMaterialDescription),
        billet_origin: text(F::BilletOrigin),
        destination: text(F::Destination),

        backlog_next_month: num(F::BacklogNextMonth),
        backlog_future: num(F::BacklogFuture),
        backlog_overdue: num(F::BacklogOverdue),
        production_vs_backlog: num(F::ProductionVsBacklog),

        original_quantity: adjustment.map(|a| a.original_quantity),
        original_end_date: adjustment.map(|a| a.original_end.date()),
        trim_ratio: adjustment.map(|a| a.ratio),

        source_revision: source.revision,
        source_modified_at: source.modified_at,
        synced_at,
    })
}

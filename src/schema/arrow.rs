// src/schema/arrow.rs

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, Date32Array, Float64Array, StringArray, TimestampMicrosecondArray, UInt32Array,
};
use arrow::datatypes::{DataType, Date32Type, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use super::types::{DailyEnergyRecord, MaterialTarget, ScheduleRecord};
use crate::sink::SinkRecord;

pub fn date32(d: NaiveDate) -> i32 {
    Date32Type::from_naive_date(d)
}

pub fn utc_micros(t: DateTime<Utc>) -> i64 {
    t.timestamp_micros()
}

fn utc_timestamp() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC")))
}

fn text(name: &str) -> Field {
    Field::new(name, DataType::Utf8, false)
}

fn number(name: &str) -> Field {
    Field::new(name, DataType::Float64, false)
}

fn utf8<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn f64s(values: impl Iterator<Item = f64>) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(values))
}

fn opt_f64s(values: impl Iterator<Item = Option<f64>>) -> ArrayRef {
    Arc::new(values.collect::<Float64Array>())
}

fn dates(values: impl Iterator<Item = Option<NaiveDate>>) -> ArrayRef {
    Arc::new(values.map(|d| d.map(date32)).collect::<Date32Array>())
}

fn timestamps(values: impl Iterator<Item = DateTime<Utc>>) -> ArrayRef {
    Arc::new(TimestampMicrosecondArray::from_iter_values(values.map(utc_micros)).with_timezone("UTC"))
}

impl SinkRecord for ScheduleRecord {
    const TABLE: &'static str = "pcp_data";
    const KEY_COLUMN: Option<&'static str> = None;

    fn natural_key(&self) -> Option<String> {
        None
    }

    fn schema() -> SchemaRef {
        let date = |name: &str| Field::new(name, DataType::Date32, true);
        Arc::new(Schema::new(vec![
            text("sap"),
            text("op"),
            text("descricao"),
            text("bitola"),
            text("familia"),
            date("inicio"),
            date("termino"),
            date("termino_final"),
            text("dia_semana"),
            number("producao_planejada"),
            number("producao_apontada"),
            number("pecas"),
            number("massa_linear"),
            number("real_prev"),
            number("qtd_campanha"),
            number("produtividade"),
            number("produtividade_nominal"),
            number("iu"),
            number("ie"),
            number("setup"),
            number("atrasos_ganhos"),
            number("paradas_progr"),
            number("tarugos"),
            text("aco"),
            text("codigo_mp"),
            text("descricao_mp"),
            text("origem_tarugos"),
            text("destino"),
            number("carteira_m1"),
            number("carteira_futura"),
            number("cart_atraso_m0"),
            number("prod_cart_total"),
            Field::new("_original_quantity", DataType::Float64, true),
            date("_original_end_date"),
            Field::new("_trim_ratio", DataType::Float64, true),
            Field::new("revisao_arquivo", DataType::UInt32, true),
            Field::new("data_modificacao_arquivo", utc_timestamp(), false),
            Field::new("data_sincronizacao", utc_timestamp(), false),
        ]))
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch> {
        let r = records;
        let columns: Vec<ArrayRef> = vec![
            utf8(r.iter().map(|x| x.material_code.as_str())),
            utf8(r.iter().map(|x| x.order_code.as_str())),
            utf8(r.iter().map(|x| x.description.as_str())),
            utf8(r.iter().map(|x| x.size_code.as_str())),
            utf8(r.iter().map(|x| x.family.as_str())),
            dates(r.iter().map(|x| x.start_date)),
            dates(r.iter().map(|x| x.end_date)),
            dates(r.iter().map(|x| x.final_end_date)),
            utf8(r.iter().map(|x| x.weekday.as_str())),
            f64s(r.iter().map(|x| x.planned_quantity)),
            f64s(r.iter().map(|x| x.reported_quantity)),
            f64s(r.iter().map(|x| x.pieces)),
            f64s(r.iter().map(|x| x.linear_mass)),
            f64s(r.iter().map(|x| x.real_vs_planned)),
            f64s(r.iter().map(|x| x.campaign_quantity)),
            f64s(r.iter().map(|x| x.productivity)),
            f64s(r.iter().map(|x| x.nominal_productivity)),
            f64s(r.iter().map(|x| x.utilization_index)),
            f64s(r.iter().map(|x| x.efficiency_index)),
            f64s(r.iter().map(|x| x.setup_minutes)),
            f64s(r.iter().map(|x| x.delays_gains)),
            f64s(r.iter().map(|x| x.scheduled_stops)),
            f64s(r.iter().map(|x| x.billets)),
            utf8(r.iter().map(|x| x.steel_grade.as_str())),
            utf8(r.iter().map(|x| x.raw_material_code.as_str())),
            utf8(r.iter().map(|x| x.raw_material_description.as_str())),
            utf8(r.iter().map(|x| x.billet_origin.as_str())),
            utf8(r.iter().map(|x| x.destination.as_str())),
            f64s(r.iter().map(|x| x.backlog_next_month)),
            f64s(r.iter().map(|x| x.backlog_future)),
            f64s(r.iter().map(|x| x.backlog_overdue)),
            f64s(r.iter().map(|x| x.production_vs_backlog)),
            opt_f64s(r.iter().map(|x| x.original_quantity)),
            dates(r.iter().map(|x| x.original_end_date)),
            opt_f64s(r.iter().map(|x| x.trim_ratio)),
            Arc::new(r.iter().map(|x| x.source_revision).collect::<UInt32Array>()),
            timestamps(r.iter().map(|x| x.source_modified_at)),
            timestamps(r.iter().map(|x| x.synced_at)),
        ];
        RecordBatch::try_new(Self::schema(), columns).context("building pcp_data batch")
    }
}

impl SinkRecord for MaterialTarget {
    const TABLE: &'static str = "metas_producao";
    const KEY_COLUMN: Option<&'static str> = Some("sap");

    fn natural_key(&self) -> Option<String> {
        Some(self.material_code.clone())
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            text("sap"),
            text("bitola"),
            text("familia"),
            number("massa_linear"),
            number("gas"),
            number("energia"),
            number("rm"),
        ]))
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch> {
        let r = records;
        let columns: Vec<ArrayRef> = vec![
            utf8(r.iter().map(|x| x.material_code.as_str())),
            utf8(r.iter().map(|x| x.size_code.as_str())),
            utf8(r.iter().map(|x| x.family.as_str())),
            f64s(r.iter().map(|x| x.linear_mass)),
            f64s(r.iter().map(|x| x.gas_target)),
            f64s(r.iter().map(|x| x.energy_target)),
            f64s(r.iter().map(|x| x.metallic_yield)),
        ];
        RecordBatch::try_new(Self::schema(), columns).context("building metas_producao batch")
    }
}

impl SinkRecord for DailyEnergyRecord {
    const TABLE: &'static str = "diario_bordo_real";
    const KEY_COLUMN: Option<&'static str> = Some("data");

    fn natural_key(&self) -> Option<String> {
        Some(self.date.to_string())
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("data", DataType::Date32, false),
            number("producao_laminacao"),
            number("producao_tl02"),
            number("consumo_gas_tl01"),
            number("consumo_gas_tl02"),
            Field::new("pcs_gn", DataType::Float64, true),
            number("consumo_energia_total"),
        ]))
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch> {
        let r = records;
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Date32Array::from_iter_values(r.iter().map(|x| date32(x.date)))),
            f64s(r.iter().map(|x| x.rolling_output)),
            f64s(r.iter().map(|x| x.tl02_output)),
            f64s(r.iter().map(|x| x.gas_tl01)),
            f64s(r.iter().map(|x| x.gas_tl02)),
            opt_f64s(r.iter().map(|x| x.gas_calorific_value)),
            f64s(r.iter().map(|x| x.energy_total)),
        ];
        RecordBatch::try_new(Self::schema(), columns).context("building diario_bordo_real batch")
    }
}

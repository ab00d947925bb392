// src/schema/types.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One operational-schedule entry as persisted in `pcp_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(rename = "sap")]
    pub material_code: String,
    #[serde(rename = "op")]
    pub order_code: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "bitola")]
    pub size_code: String,
    #[serde(rename = "familia")]
    pub family: String,

    #[serde(rename = "inicio")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "termino")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "termino_final")]
    pub final_end_date: Option<NaiveDate>,
    #[serde(rename = "dia_semana")]
    pub weekday: String,

    #[serde(rename = "producao_planejada")]
    pub planned_quantity: f64,
    #[serde(rename = "producao_apontada")]
    pub reported_quantity: f64,
    #[serde(rename = "pecas")]
    pub pieces: f64,
    #[serde(rename = "massa_linear")]
    pub linear_mass: f64,
    #[serde(rename = "real_prev")]
    pub real_vs_planned: f64,
    #[serde(rename = "qtd_campanha")]
    pub campaign_quantity: f64,

    #[serde(rename = "produtividade")]
    pub productivity: f64,
    #[serde(rename = "produtividade_nominal")]
    pub nominal_productivity: f64,
    #[serde(rename = "iu")]
    pub utilization_index: f64,
    #[serde(rename = "ie")]
    pub efficiency_index: f64,
    #[serde(rename = "setup")]
    pub setup_minutes: f64,
    #[serde(rename = "atrasos_ganhos")]
    pub delays_gains: f64,
    #[serde(rename = "paradas_progr")]
    pub scheduled_stops: f64,

    #[serde(rename = "tarugos")]
    pub billets: f64,
    #[serde(rename = "aco")]
    pub steel_grade: String,
    #[serde(rename = "codigo_mp")]
    pub raw_material_code: String,
    #[serde(rename = "descricao_mp")]
    pub raw_material_description: String,
    #[serde(rename = "origem_tarugos")]
    pub billet_origin: String,
    #[serde(rename = "destino")]
    pub destination: String,

    #[serde(rename = "carteira_m1")]
    pub backlog_next_month: f64,
    #[serde(rename = "carteira_futura")]
    pub backlog_future: f64,
    #[serde(rename = "cart_atraso_m0")]
    pub backlog_overdue: f64,
    #[serde(rename = "prod_cart_total")]
    pub production_vs_backlog: f64,

    // audit fields, set only on the reconciled entry
    #[serde(rename = "_original_quantity")]
    pub original_quantity: Option<f64>,
    #[serde(rename = "_original_end_date")]
    pub original_end_date: Option<NaiveDate>,
    #[serde(rename = "_trim_ratio")]
    pub trim_ratio: Option<f64>,

    #[serde(rename = "revisao_arquivo")]
    pub source_revision: Option<u32>,
    #[serde(rename = "data_modificacao_arquivo")]
    pub source_modified_at: DateTime<Utc>,
    #[serde(rename = "data_sincronizacao")]
    pub synced_at: DateTime<Utc>,
}

/// Per-material production targets (`metas_producao`), keyed by material code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTarget {
    #[serde(rename = "sap")]
    pub material_code: String,
    #[serde(rename = "bitola")]
    pub size_code: String,
    #[serde(rename = "familia")]
    pub family: String,
    #[serde(rename = "massa_linear")]
    pub linear_mass: f64,
    #[serde(rename = "gas")]
    pub gas_target: f64,
    #[serde(rename = "energia")]
    pub energy_target: f64,
    #[serde(rename = "rm")]
    pub metallic_yield: f64,
}

/// One day of the energy log (`diario_bordo_real`), keyed by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEnergyRecord {
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "producao_laminacao")]
    pub rolling_output: f64,
    #[serde(rename = "producao_tl02")]
    pub tl02_output: f64,
    #[serde(rename = "consumo_gas_tl01")]
    pub gas_tl01: f64,
    #[serde(rename = "consumo_gas_tl02")]
    pub gas_tl02: f64,
    #[serde(rename = "pcs_gn")]
    pub gas_calorific_value: Option<f64>,
    #[serde(rename = "consumo_energia_total")]
    pub energy_total: f64,
}

impl DailyEnergyRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            rolling_output: 0.0,
            tl02_output: 0.0,
            gas_tl01: 0.0,
            gas_tl02: 0.0,
            gas_calorific_value: None,
            energy_total: 0.0,
        }
    }
}

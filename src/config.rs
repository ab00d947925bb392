// src/config.rs
use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, path::PathBuf};

use crate::process::columns::AliasTable;
use crate::schema::fields::{schedule_aliases, ScheduleField};

/// Everything a sync run can be tuned with. Every field has a default, so an
/// empty (or absent) YAML file yields the production behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub schedule: ScheduleConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Label that always appears in the header row.
    pub header_sentinel: String,
    /// Rows scanned for the sentinel before falling back to row 0.
    pub header_scan_depth: usize,
    /// Numeric cells at or below this serial are not dates.
    pub min_date_serial: f64,
    /// Dated rows starting this many minutes before month start are kept.
    pub start_tolerance_minutes: i64,
    /// Description stems marking relevant undated activities.
    pub relevant_keywords: Vec<String>,
    /// Order codes that disqualify an undated row.
    pub excluded_order_codes: Vec<String>,
    pub max_ratio: f64,
    pub small_base_max_ratio: f64,
    /// Quantities below this use `small_base_max_ratio`.
    pub small_base_threshold: f64,
    pub sheet_exact: Vec<String>,
    pub sheet_partial: Vec<String>,
    /// Appended after the built-in aliases of each field.
    pub extra_aliases: HashMap<ScheduleField, Vec<String>>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            header_sentinel: "OP".into(),
            header_scan_depth: 15,
            min_date_serial: 40_000.0,
            start_tolerance_minutes: 60,
            relevant_keywords: vec!["setup".into(), "troca".into(), "preventiva".into()],
            excluded_order_codes: vec!["M03".into(), "OP".into(), "-".into()],
            max_ratio: 5.0,
            small_base_max_ratio: 100.0,
            small_base_threshold: 1.0,
            sheet_exact: vec!["tl1".into(), "tl01".into(), "tl 1".into(), "tl 01".into()],
            sheet_partial: vec!["tl1".into(), "tl01".into()],
            extra_aliases: HashMap::new(),
        }
    }
}

impl ScheduleConfig {
    pub fn start_tolerance(&self) -> Duration {
        Duration::minutes(self.start_tolerance_minutes)
    }

    /// Built-in alias table extended with the configured extras.
    pub fn alias_table(&self) -> AliasTable<ScheduleField> {
        let mut table = schedule_aliases();
        for (field, extra) in &self.extra_aliases {
            table.extend(*field, extra.iter().cloned());
        }
        table
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SinkConfig {
    pub batch_size: usize,
    pub out_dir: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            out_dir: PathBuf::from("store"),
        }
    }
}

impl SyncConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing sync config")
    }

    /// Reads `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                Self::from_yaml(&text)
            }
            None => Ok(Self::default()),
        }
    }
}

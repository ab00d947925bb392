// src/sink/mod.rs
pub mod memory;
pub mod store;

pub use memory::MemorySink;
pub use store::ParquetSink;

use anyhow::{bail, Context, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use tracing::{error, info, instrument};

/// A record type that knows its destination table and Arrow layout.
pub trait SinkRecord: Serialize + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    /// Column holding the natural key, for tables delivered by upsert.
    const KEY_COLUMN: Option<&'static str>;

    fn natural_key(&self) -> Option<String>;
    fn schema() -> SchemaRef;
    fn to_batch(records: &[Self]) -> Result<RecordBatch>;
}

/// Destination store for one record type.
#[allow(async_fn_in_trait)]
pub trait BatchSink<R: SinkRecord> {
    async fn delete_all(&mut self) -> Result<()>;
    async fn insert(&mut self, batch: &[R]) -> Result<()>;
    /// Replaces rows sharing a natural key with the batch's rows.
    async fn upsert(&mut self, batch: &[R]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Delete everything, then insert.
    Replace,
    /// Upsert by natural key.
    Upsert,
}

/// Record counts of one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub succeeded: usize,
    pub failed: usize,
    pub failed_batches: usize,
}

/// Field names of a record as serialized, for failure diagnostics.
fn field_names<R: Serialize>(record: &R) -> Vec<String> {
    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Sends `records` in sequential batches of `batch_size`. A failed batch is
/// counted and logged and the next batch is still attempted; a failed
/// replace-all delete aborts before anything is inserted.
#[instrument(level = "info", skip(sink, records), fields(table = R::TABLE, records = records.len()))]
pub async fn deliver<R, S>(
    sink: &mut S,
    records: &[R],
    mode: WriteMode,
    batch_size: usize,
) -> Result<DeliveryReport>
where
    R: SinkRecord,
    S: BatchSink<R>,
{
    if batch_size == 0 {
        bail!("batch size must be positive");
    }
    if mode == WriteMode::Upsert && R::KEY_COLUMN.is_none() {
        bail!("table {} has no natural key to upsert on", R::TABLE);
    }

    if mode == WriteMode::Replace {
        sink.delete_all()
            .await
            .with_context(|| format!("clearing {} before insert", R::TABLE))?;
        info!(table = R::TABLE, "cleared previous rows");
    }

    let mut report = DeliveryReport::default();
    for (idx, batch) in records.chunks(batch_size).enumerate() {
        let from = idx * batch_size;
        let result = match mode {
            WriteMode::Replace => sink.insert(batch).await,
            WriteMode::Upsert => sink.upsert(batch).await,
        };
        match result {
            Ok(()) => report.succeeded += batch.len(),
            Err(e) => {
                error!(
                    table = R::TABLE,
                    from,
                    to = from + batch.len(),
                    fields = ?batch.first().map(field_names).unwrap_or_default(),
                    "batch failed: {:#}",
                    e
                );
                report.failed += batch.len();
                report.failed_batches += 1;
            }
        }
    }

    info!(
        table = R::TABLE,
        succeeded = report.succeeded,
        failed = report.failed,
        "delivery finished"
    );
    Ok(report)
}

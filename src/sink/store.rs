// src/sink/store.rs
use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{Array, AsArray, BooleanArray};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Date32Type, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::{
    collections::HashSet,
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use super::{BatchSink, SinkRecord};

/// One directory of Parquet part files per table under `root`.
#[derive(Debug, Clone)]
pub struct ParquetSink {
    root: PathBuf,
}

impl ParquetSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn table_dir<R: SinkRecord>(&self) -> PathBuf {
        self.root.join(R::TABLE)
    }

    /// Every stored batch of the table, in part order.
    pub async fn read_table<R: SinkRecord>(&self) -> Result<Vec<RecordBatch>> {
        let dir = self.table_dir::<R>();
        tokio::task::spawn_blocking(move || read_parts(&list_parts(&dir)?))
            .await
            .context("parquet read task panicked")?
    }
}

fn list_parts(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("part-*.parquet");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| anyhow!("non-UTF-8 table path {}", dir.display()))?;
    let mut parts = Vec::new();
    for entry in glob::glob(pattern).context("bad part glob")? {
        parts.push(entry.context("listing part files")?);
    }
    parts.sort();
    Ok(parts)
}

fn next_part_path(dir: &Path) -> Result<PathBuf> {
    let next = list_parts(dir)?
        .iter()
        .filter_map(|p| p.file_stem()?.to_str()?.strip_prefix("part-")?.parse::<u64>().ok())
        .max()
        .map_or(0, |n| n + 1);
    Ok(dir.join(format!("part-{:06}.parquet", next)))
}

/// Writes `batches` into a new part file (temp file, then rename).
fn write_part(dir: &Path, schema: SchemaRef, batches: &[RecordBatch]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let out_path = next_part_path(dir)?;
    let tmp_path = out_path.with_extension("parquet.tmp");

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(3)?))
        .build();
    let file = File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, schema, Some(props)).context("creating parquet writer")?;
    for batch in batches {
        writer.write(batch).context("writing batch to parquet")?;
    }
    writer.close().context("closing parquet writer")?;

    fs::rename(&tmp_path, &out_path).with_context(|| {
        format!("renaming {} -> {}", tmp_path.display(), out_path.display())
    })?;
    Ok(out_path)
}

fn read_parts(parts: &[PathBuf]) -> Result<Vec<RecordBatch>> {
    let mut out = Vec::new();
    for path in parts {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("reading parquet metadata of {}", path.display()))?
            .build()
            .context("building parquet reader")?;
        for batch in reader {
            out.push(batch.with_context(|| format!("decoding {}", path.display()))?);
        }
    }
    Ok(out)
}

fn remove_parts(parts: &[PathBuf]) -> Result<()> {
    for path in parts {
        fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    Ok(())
}

/// Renames `parts` to `*.parquet.old`, out of the `part-*.parquet` glob, so
/// readers never see them next to the part that replaces them.
fn stage_parts(parts: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(parts.len());
    for path in parts {
        let old = path.with_extension("parquet.old");
        if let Err(e) = fs::rename(path, &old) {
            unstage_parts(&staged);
            return Err(e).with_context(|| format!("staging {}", path.display()));
        }
        staged.push(old);
    }
    Ok(staged)
}

/// Puts staged parts back under their part names after a failed rewrite.
fn unstage_parts(staged: &[PathBuf]) {
    for old in staged {
        let part = old.with_extension("");
        if let Err(e) = fs::rename(old, &part) {
            warn!(path = %old.display(), "could not restore staged part: {}", e);
        }
    }
}

/// Natural key of each row, rendered the way `SinkRecord::natural_key` renders it.
fn key_strings(batch: &RecordBatch, column: &str) -> Result<Vec<Option<String>>> {
    let col = batch
        .column_by_name(column)
        .ok_or_else(|| anyhow!("key column `{}` missing from stored batch", column))?;
    let keys = match col.data_type() {
        DataType::Utf8 => {
            let arr = col.as_string::<i32>();
            (0..arr.len())
                .map(|i| (!arr.is_null(i)).then(|| arr.value(i).to_string()))
                .collect()
        }
        DataType::Date32 => {
            let arr = col.as_primitive::<Date32Type>();
            (0..arr.len())
                .map(|i| {
                    if arr.is_null(i) {
                        None
                    } else {
                        arr.value_as_date(i).map(|d| d.to_string())
                    }
                })
                .collect()
        }
        other => bail!("unsupported key column type {:?}", other),
    };
    Ok(keys)
}

/// Stored rows whose key is not in `replaced`, rebuilt on `schema`.
fn keep_unreplaced(
    stored: Vec<RecordBatch>,
    column: &str,
    replaced: &HashSet<String>,
    schema: &SchemaRef,
) -> Result<Vec<RecordBatch>> {
    let mut kept = Vec::with_capacity(stored.len());
    for batch in stored {
        let mask: BooleanArray = key_strings(&batch, column)?
            .into_iter()
            .map(|k| Some(k.map_or(true, |k| !replaced.contains(&k))))
            .collect();
        let filtered = filter_record_batch(&batch, &mask).context("filtering stored rows")?;
        if filtered.num_rows() > 0 {
            kept.push(
                filtered
                    .with_schema(schema.clone())
                    .context("stored rows no longer match the table schema")?,
            );
        }
    }
    Ok(kept)
}

impl<R: SinkRecord> BatchSink<R> for ParquetSink {
    async fn delete_all(&mut self) -> Result<()> {
        let dir = self.table_dir::<R>();
        tokio::task::spawn_blocking(move || {
            let parts = list_parts(&dir)?;
            remove_parts(&parts)?;
            debug!(table = R::TABLE, removed = parts.len(), "removed part files");
            Ok(())
        })
        .await
        .context("parquet delete task panicked")?
    }

    async fn insert(&mut self, records: &[R]) -> Result<()> {
        let batch = R::to_batch(records)?;
        let dir = self.table_dir::<R>();
        tokio::task::spawn_blocking(move || {
            let path = write_part(&dir, batch.schema(), &[batch])?;
            debug!(table = R::TABLE, path = %path.display(), "wrote part");
            Ok(())
        })
        .await
        .context("parquet insert task panicked")?
    }

    async fn upsert(&mut self, records: &[R]) -> Result<()> {
        let Some(column) = R::KEY_COLUMN else {
            bail!("table {} has no natural key", R::TABLE);
        };
        let replaced: HashSet<String> = records.iter().filter_map(R::natural_key).collect();
        let batch = R::to_batch(records)?;
        let dir = self.table_dir::<R>();

        tokio::task::spawn_blocking(move || {
            let old_parts = list_parts(&dir)?;
            let schema = R::schema();
            let mut batches = keep_unreplaced(read_parts(&old_parts)?, column, &replaced, &schema)?;
            let kept: usize = batches.iter().map(RecordBatch::num_rows).sum();
            batches.push(batch);

            let staged = stage_parts(&old_parts)?;
            let path = match write_part(&dir, schema, &batches) {
                Ok(path) => path,
                Err(e) => {
                    unstage_parts(&staged);
                    return Err(e);
                }
            };
            remove_parts(&staged)?;
            debug!(
                table = R::TABLE,
                kept,
                upserted = replaced.len(),
                path = %path.display(),
                "rewrote table"
            );
            Ok(())
        })
        .await
        .context("parquet upsert task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DailyEnergyRecord, MaterialTarget};
    use chrono::NaiveDate;

    fn target(code: &str, gas: f64) -> MaterialTarget {
        MaterialTarget {
            material_code: code.into(),
            size_code: "8.0".into(),
            family: "CA60".into(),
            linear_mass: 0.395,
            gas_target: gas,
            energy_target: 0.0,
            metallic_yield: 0.0,
        }
    }

    fn rows(batches: &[RecordBatch]) -> usize {
        batches.iter().map(RecordBatch::num_rows).sum()
    }

    fn gas_by_code(batches: &[RecordBatch]) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        for b in batches {
            let codes = b.column_by_name("sap").unwrap().as_string::<i32>();
            let gas = b
                .column_by_name("gas")
                .unwrap()
                .as_primitive::<arrow::datatypes::Float64Type>();
            for i in 0..b.num_rows() {
                out.push((codes.value(i).to_string(), gas.value(i)));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    #[tokio::test]
    async fn insert_then_delete_all() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut sink = ParquetSink::new(dir.path());

        sink.insert(&[target("1", 1.0), target("2", 2.0)]).await?;
        sink.insert(&[target("3", 3.0)]).await?;
        let parts = list_parts(&sink.table_dir::<MaterialTarget>())?;
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("part-000000.parquet"));
        assert_eq!(rows(&sink.read_table::<MaterialTarget>().await?), 3);

        BatchSink::<MaterialTarget>::delete_all(&mut sink).await?;
        assert_eq!(rows(&sink.read_table::<MaterialTarget>().await?), 0);
        // deleting an empty table is fine
        BatchSink::<MaterialTarget>::delete_all(&mut sink).await?;
        Ok(())
    }

    #[tokio::test]
    async fn upsert_replaces_matching_keys() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut sink = ParquetSink::new(dir.path());

        sink.upsert(&[target("A", 1.0), target("B", 2.0)]).await?;
        sink.upsert(&[target("B", 20.0), target("C", 30.0)]).await?;

        let stored = sink.read_table::<MaterialTarget>().await?;
        assert_eq!(
            gas_by_code(&stored),
            vec![
                ("A".to_string(), 1.0),
                ("B".to_string(), 20.0),
                ("C".to_string(), 30.0)
            ]
        );
        // consolidated into a single part
        assert_eq!(list_parts(&sink.table_dir::<MaterialTarget>())?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn upsert_leaves_one_part_and_no_staged_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut sink = ParquetSink::new(dir.path());
        sink.insert(&[target("A", 1.0)]).await?;
        sink.insert(&[target("B", 2.0)]).await?;
        sink.upsert(&[target("A", 10.0)]).await?;

        let table = sink.table_dir::<MaterialTarget>();
        let mut files: Vec<String> = fs::read_dir(&table)?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<_>>()?;
        files.sort();
        assert_eq!(files, ["part-000000.parquet"]);
        assert_eq!(
            gas_by_code(&sink.read_table::<MaterialTarget>().await?),
            vec![("A".to_string(), 10.0), ("B".to_string(), 2.0)]
        );
        Ok(())
    }

    #[test]
    fn staged_parts_leave_the_glob_and_can_return() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let parts: Vec<PathBuf> = ["part-000000.parquet", "part-000001.parquet"]
            .iter()
            .map(|n| dir.path().join(n))
            .collect();
        for p in &parts {
            fs::write(p, b"x")?;
        }

        let staged = stage_parts(&parts)?;
        assert!(list_parts(dir.path())?.is_empty());
        assert!(staged[0].ends_with("part-000000.parquet.old"));
        // a rewrite starts numbering again while the old parts are staged
        assert!(next_part_path(dir.path())?.ends_with("part-000000.parquet"));

        unstage_parts(&staged);
        assert_eq!(list_parts(dir.path())?, parts);

        let staged = stage_parts(&parts)?;
        remove_parts(&staged)?;
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn upsert_by_date_key() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut sink = ParquetSink::new(dir.path());
        let day = |d: u32, prod: f64| DailyEnergyRecord {
            rolling_output: prod,
            ..DailyEnergyRecord::new(NaiveDate::from_ymd_opt(2025, 2, d).unwrap())
        };

        sink.upsert(&[day(1, 100.0), day(2, 200.0)]).await?;
        sink.upsert(&[day(2, 250.0)]).await?;

        let stored = sink.read_table::<DailyEnergyRecord>().await?;
        assert_eq!(rows(&stored), 2);
        let keys: Vec<Option<String>> = stored
            .iter()
            .map(|b| key_strings(b, "data"))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
        assert!(keys.contains(&Some("2025-02-01".to_string())));
        assert!(keys.contains(&Some("2025-02-02".to_string())));
        Ok(())
    }
}

// src/sink/memory.rs
use anyhow::{bail, Result};
use std::collections::HashSet;
use tracing::debug;

use super::{BatchSink, SinkRecord};

/// In-memory table. Used for dry runs and for exercising delivery
/// accounting with injected failures.
#[derive(Debug, Clone)]
pub struct MemorySink<R> {
    rows: Vec<R>,
    calls: usize,
    failing: HashSet<usize>,
    fail_delete: bool,
}

impl<R> Default for MemorySink<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            calls: 0,
            failing: HashSet::new(),
            fail_delete: false,
        }
    }
}

impl<R: SinkRecord> MemorySink<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write calls (zero-based) that should fail.
    pub fn failing_batches(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing.extend(calls);
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Number of insert/upsert calls received.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn next_call(&mut self) -> Result<()> {
        let call = self.calls;
        self.calls += 1;
        if self.failing.contains(&call) {
            bail!("injected failure on write #{}", call);
        }
        Ok(())
    }
}

impl<R: SinkRecord> BatchSink<R> for MemorySink<R> {
    async fn delete_all(&mut self) -> Result<()> {
        if self.fail_delete {
            bail!("injected delete failure");
        }
        self.rows.clear();
        Ok(())
    }

    async fn insert(&mut self, batch: &[R]) -> Result<()> {
        self.next_call()?;
        self.rows.extend_from_slice(batch);
        debug!(table = R::TABLE, rows = batch.len(), "inserted");
        Ok(())
    }

    async fn upsert(&mut self, batch: &[R]) -> Result<()> {
        self.next_call()?;
        for rec in batch {
            let key = rec.natural_key();
            match self
                .rows
                .iter_mut()
                .find(|r| key.is_some() && r.natural_key() == key)
            {
                Some(existing) => *existing = rec.clone(),
                None => self.rows.push(rec.clone()),
            }
        }
        debug!(table = R::TABLE, rows = batch.len(), "upserted");
        Ok(())
    }
}

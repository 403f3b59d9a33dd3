//! The two ingestion drivers over the shared classify/index pipeline.
//!
//! `load_catalog` is the live path: one streaming pass straight into an
//! in-memory `FundIndex`, last write wins.
//!
//! `CheckpointedLoader` is the resumable path for catalogs too large or too
//! slow to process in one go: bounded batches, progress and entities
//! committed to a durable `CatalogStore` after every batch, transparent
//! resume from the persisted cursor after a crash or restart. Designed for
//! strictly sequential invocation by an external scheduler.

use crate::classifier::classify;
use crate::index::FundIndex;
use crate::persist::{now_rfc3339, CatalogStore, LoaderCheckpoint, RecordError};
use crate::stream::{parse_record, JsonArrayStream, RecordStream};
use crate::FundEntity;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Live single-pass driver: stream, classify, index in memory. Malformed
/// records are skipped and logged; stream I/O failure aborts the run.
pub fn load_catalog<R: Read>(reader: R) -> Result<FundIndex> {
    let mut index = FundIndex::new();
    let mut records = RecordStream::new(reader);
    while let Some(raw) = records.next_record()? {
        index.insert(classify(&raw));
    }
    tracing::info!(
        indexed = index.len(),
        skipped = records.skipped(),
        "catalog loaded"
    );
    Ok(index)
}

/// Outcome of one `process_next_batch` call.
#[derive(Debug)]
pub struct BatchProgress {
    pub processed: u64,
    pub total_records: u64,
    pub total_is_exact: bool,
    pub complete: bool,
    /// Entities classified and committed in this call (records that were
    /// already in the store are skipped, not re-derived).
    pub batch: Vec<FundEntity>,
    pub errors_in_batch: usize,
}

pub struct CheckpointedLoader {
    source: PathBuf,
    store: CatalogStore,
}

impl CheckpointedLoader {
    pub fn open(source: impl AsRef<Path>, store_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            source: source.as_ref().to_path_buf(),
            store: CatalogStore::open(store_path)?,
        })
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn checkpoint(&self) -> Result<Option<LoaderCheckpoint>> {
        self.store.checkpoint()
    }

    /// Consume up to `batch_size` further records from the source, classify
    /// and persist the ones not already stored, then commit the updated
    /// checkpoint and flush. A failure before the commit leaves the previous
    /// checkpoint fully intact, so the batch can simply be retried.
    pub fn process_next_batch(&mut self, batch_size: usize) -> Result<BatchProgress> {
        let mut cp = self.store.checkpoint()?.unwrap_or_default();
        if cp.complete {
            return Ok(BatchProgress {
                processed: cp.processed,
                total_records: cp.total_records,
                total_is_exact: cp.total_is_exact,
                complete: true,
                batch: Vec::new(),
                errors_in_batch: 0,
            });
        }

        let file = File::open(&self.source)
            .with_context(|| format!("opening catalog source {}", self.source.display()))?;
        let file_len = file
            .metadata()
            .context("reading catalog source metadata")?
            .len();
        let reader = BufReader::new(file);
        let mut stream = if cp.cursor > 0 {
            JsonArrayStream::resume(reader, cp.cursor)?
        } else {
            JsonArrayStream::new(reader)
        };

        let mut staged: Vec<FundEntity> = Vec::new();
        let mut errors_in_batch = 0usize;
        let mut taken = 0usize;
        while taken < batch_size.max(1) {
            let Some(raw) = stream.next_raw()? else {
                break;
            };
            taken += 1;
            cp.processed += 1;
            match parse_record(&raw) {
                Ok(rec) => {
                    // Present entities were committed by an earlier batch
                    // (or survived an interrupted one); re-deriving them is
                    // skipped, not repeated.
                    if !self.store.contains_entity(rec.scheme_code)? {
                        staged.push(classify(&rec));
                    }
                }
                Err(e) => {
                    errors_in_batch += 1;
                    tracing::warn!(
                        scheme_code = ?e.scheme_code,
                        reason = %e.reason,
                        "recording malformed catalog record"
                    );
                    cp.errors.push(RecordError {
                        scheme_code: e.scheme_code.unwrap_or(0),
                        reason: e.reason,
                    });
                }
            }
        }

        cp.cursor = stream.offset();
        if stream.finished() {
            cp.complete = true;
            cp.total_records = cp.processed;
            cp.total_is_exact = true;
        } else if cp.cursor > 0 {
            // Byte-position extrapolation until the stream has been scanned
            // through once.
            let estimate = (cp.processed as f64 * file_len as f64 / cp.cursor as f64).round();
            cp.total_records = (estimate as u64).max(cp.processed);
            cp.total_is_exact = false;
        }
        cp.updated_at = now_rfc3339();

        // Commit: entities first, then the checkpoint, then flush. The
        // checkpoint never references records that were not written.
        for entity in &staged {
            self.store.put_entity(entity)?;
        }
        self.store.save_checkpoint(&cp)?;
        self.store.flush()?;

        tracing::info!(
            processed = cp.processed,
            total = cp.total_records,
            exact = cp.total_is_exact,
            complete = cp.complete,
            batch = staged.len(),
            errors = errors_in_batch,
            "committed catalog batch"
        );
        Ok(BatchProgress {
            processed: cp.processed,
            total_records: cp.total_records,
            total_is_exact: cp.total_is_exact,
            complete: cp.complete,
            batch: staged,
            errors_in_batch,
        })
    }

    /// Drive batches until the checkpoint reports completion.
    pub fn run_to_completion(&mut self, batch_size: usize) -> Result<LoaderCheckpoint> {
        loop {
            let progress = self.process_next_batch(batch_size)?;
            if progress.complete {
                break;
            }
        }
        self.store
            .checkpoint()?
            .context("checkpoint missing after completed run")
    }

    /// Rebuild an in-memory index from the entity store.
    pub fn load_index(&self) -> Result<FundIndex> {
        index_from_store(&self.store)
    }
}

/// Rebuild an in-memory index from a stably checkpointed store (idempotent
/// inserts, so stored duplicates cannot double-post).
pub fn index_from_store(store: &CatalogStore) -> Result<FundIndex> {
    let mut index = FundIndex::new();
    for entity in store.entities() {
        index.insert_if_absent(entity?);
    }
    Ok(index)
}

//! Durable local storage for the checkpointed loader: the loader checkpoint
//! and the materialized entity store, both living in one embedded sled
//! database and round-tripping losslessly through bincode.

use crate::{FundEntity, SchemeCode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const CHECKPOINT_KEY: &[u8] = b"loader/checkpoint";
const ENTITY_TREE: &str = "entities";

/// One record that failed parsing or processing during a checkpointed run,
/// eligible for an explicit retry on a later pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordError {
    /// 0 when no scheme code could be recovered from the raw object.
    pub scheme_code: SchemeCode,
    pub reason: String,
}

/// Persisted loader progress. `processed` and `cursor` only ever grow; a
/// fresh build requires an explicit `CatalogStore::clear`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderCheckpoint {
    /// Estimated until `total_is_exact`, then exact.
    pub total_records: u64,
    pub total_is_exact: bool,
    pub processed: u64,
    /// Byte offset into the source stream just past the last committed
    /// record.
    pub cursor: u64,
    pub complete: bool,
    pub errors: Vec<RecordError>,
    pub created_at: String,
    pub updated_at: String,
}

impl LoaderCheckpoint {
    pub fn new() -> Self {
        let now = now_rfc3339();
        Self {
            total_records: 0,
            total_is_exact: false,
            processed: 0,
            cursor: 0,
            complete: false,
            errors: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl Default for LoaderCheckpoint {
    fn default() -> Self {
        Self::new()
    }
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Embedded store for checkpoint + entities. All writes become durable on
/// `flush`; the loader flushes once per committed batch.
pub struct CatalogStore {
    db: sled::Db,
    entities: sled::Tree,
}

impl CatalogStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path.as_ref()).context("opening catalog store")?;
        let entities = db.open_tree(ENTITY_TREE)?;
        Ok(Self { db, entities })
    }

    pub fn checkpoint(&self) -> Result<Option<LoaderCheckpoint>> {
        match self.db.get(CHECKPOINT_KEY)? {
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).context("decoding loader checkpoint")?,
            )),
            None => Ok(None),
        }
    }

    pub fn save_checkpoint(&self, checkpoint: &LoaderCheckpoint) -> Result<()> {
        self.db
            .insert(CHECKPOINT_KEY, bincode::serialize(checkpoint)?)?;
        Ok(())
    }

    pub fn put_entity(&self, entity: &FundEntity) -> Result<()> {
        self.entities
            .insert(entity.scheme_code.to_be_bytes(), bincode::serialize(entity)?)?;
        Ok(())
    }

    pub fn contains_entity(&self, code: SchemeCode) -> Result<bool> {
        Ok(self.entities.contains_key(code.to_be_bytes())?)
    }

    pub fn get_entity(&self, code: SchemeCode) -> Result<Option<FundEntity>> {
        match self.entities.get(code.to_be_bytes())? {
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).context("decoding stored entity")?,
            )),
            None => Ok(None),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// All stored entities in scheme-code order.
    pub fn entities(&self) -> impl Iterator<Item = Result<FundEntity>> + '_ {
        self.entities.iter().map(|kv| {
            let (_, value) = kv?;
            Ok(bincode::deserialize(&value).context("decoding stored entity")?)
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Drop the checkpoint and every stored entity. This is the only way to
    /// force a from-scratch catalog build.
    pub fn clear(&self) -> Result<()> {
        self.entities.clear()?;
        self.db.remove(CHECKPOINT_KEY)?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::RawFundRecord;
    use tempfile::tempdir;

    #[test]
    fn checkpoint_and_entities_round_trip() {
        let dir = tempdir().unwrap();
        let store = CatalogStore::open(dir.path()).unwrap();

        assert!(store.checkpoint().unwrap().is_none());

        let mut cp = LoaderCheckpoint::new();
        cp.processed = 7;
        cp.cursor = 1234;
        cp.errors.push(RecordError {
            scheme_code: 99,
            reason: "bad name".into(),
        });
        store.save_checkpoint(&cp).unwrap();

        let entity = classify(&RawFundRecord {
            scheme_code: 1,
            scheme_name: "HDFC Large Cap Fund Direct Growth".into(),
            isin_growth: Some("INF179K01UT0".into()),
            isin_div_reinvestment: None,
        });
        store.put_entity(&entity).unwrap();
        store.flush().unwrap();

        let loaded = store.checkpoint().unwrap().unwrap();
        assert_eq!(loaded.processed, 7);
        assert_eq!(loaded.cursor, 1234);
        assert_eq!(loaded.errors.len(), 1);

        assert!(store.contains_entity(1).unwrap());
        assert_eq!(store.get_entity(1).unwrap().unwrap(), entity);
        assert_eq!(store.entity_count(), 1);

        store.clear().unwrap();
        assert!(store.checkpoint().unwrap().is_none());
        assert_eq!(store.entity_count(), 0);
    }
}

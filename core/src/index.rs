//! The in-memory catalog index: entity map plus three inverted mappings
//! (token, sub-category, fund house) from discriminator to scheme codes.
//!
//! Built by one of the two ingestion drivers in `loader` and read by the
//! query engine. Not safe for concurrent writers; concurrent read-only
//! queries against a built index are fine.

use crate::{FundEntity, SchemeCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FundIndex {
    entities: HashMap<SchemeCode, FundEntity>,
    /// Ordered so prefix lookups are range scans.
    pub(crate) token_index: BTreeMap<String, BTreeSet<SchemeCode>>,
    /// Keyed by sub-category ("Mid Cap", "Liquid", ...).
    pub(crate) category_index: BTreeMap<String, BTreeSet<SchemeCode>>,
    pub(crate) house_index: BTreeMap<String, BTreeSet<SchemeCode>>,
}

impl FundIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, code: SchemeCode) -> bool {
        self.entities.contains_key(&code)
    }

    pub fn get(&self, code: SchemeCode) -> Option<&FundEntity> {
        self.entities.get(&code)
    }

    pub fn entities(&self) -> impl Iterator<Item = &FundEntity> {
        self.entities.values()
    }

    pub fn scheme_codes(&self) -> impl Iterator<Item = SchemeCode> + '_ {
        self.entities.keys().copied()
    }

    /// Insert with last-write-wins semantics (live in-memory mode). A
    /// re-inserted scheme code has its previous postings removed first so
    /// every code stays in exactly one category and house bucket.
    pub fn insert(&mut self, entity: FundEntity) {
        if let Some(old) = self.entities.remove(&entity.scheme_code) {
            self.remove_postings(&old);
        }
        self.add_postings(&entity);
        self.entities.insert(entity.scheme_code, entity);
    }

    /// Idempotent insert (checkpointed mode): a scheme code that is already
    /// indexed is skipped. Returns whether the entity was inserted.
    pub fn insert_if_absent(&mut self, entity: FundEntity) -> bool {
        if self.entities.contains_key(&entity.scheme_code) {
            return false;
        }
        self.add_postings(&entity);
        self.entities.insert(entity.scheme_code, entity);
        true
    }

    fn add_postings(&mut self, entity: &FundEntity) {
        let code = entity.scheme_code;
        for token in &entity.search_tokens {
            self.token_index.entry(token.clone()).or_default().insert(code);
        }
        self.category_index
            .entry(entity.sub_category.clone())
            .or_default()
            .insert(code);
        self.house_index
            .entry(entity.fund_house.clone())
            .or_default()
            .insert(code);
    }

    fn remove_postings(&mut self, entity: &FundEntity) {
        let code = entity.scheme_code;
        for token in &entity.search_tokens {
            if let Some(bucket) = self.token_index.get_mut(token) {
                bucket.remove(&code);
                if bucket.is_empty() {
                    self.token_index.remove(token);
                }
            }
        }
        if let Some(bucket) = self.category_index.get_mut(&entity.sub_category) {
            bucket.remove(&code);
            if bucket.is_empty() {
                self.category_index.remove(&entity.sub_category);
            }
        }
        if let Some(bucket) = self.house_index.get_mut(&entity.fund_house) {
            bucket.remove(&code);
            if bucket.is_empty() {
                self.house_index.remove(&entity.fund_house);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::RawFundRecord;

    fn entity(code: u32, name: &str) -> FundEntity {
        classify(&RawFundRecord {
            scheme_code: code,
            scheme_name: name.to_string(),
            isin_growth: None,
            isin_div_reinvestment: None,
        })
    }

    #[test]
    fn insert_overwrites_and_cleans_old_postings() {
        let mut idx = FundIndex::new();
        idx.insert(entity(1, "HDFC Small Cap Fund"));
        assert!(idx.category_index.contains_key("Small Cap"));

        idx.insert(entity(1, "HDFC Liquid Fund"));
        assert_eq!(idx.len(), 1);
        assert!(!idx.category_index.contains_key("Small Cap"));
        assert!(idx.category_index["Liquid"].contains(&1));
    }

    #[test]
    fn insert_if_absent_skips_existing() {
        let mut idx = FundIndex::new();
        assert!(idx.insert_if_absent(entity(1, "HDFC Small Cap Fund")));
        assert!(!idx.insert_if_absent(entity(1, "HDFC Liquid Fund")));
        assert_eq!(idx.get(1).unwrap().sub_category, "Small Cap");
    }

    #[test]
    fn every_token_posts_the_scheme_code() {
        let mut idx = FundIndex::new();
        let e = entity(9, "Axis Flexi Cap Fund Direct Growth");
        let tokens = e.search_tokens.clone();
        idx.insert(e);
        for t in &tokens {
            assert!(idx.token_index[t].contains(&9), "missing token {t}");
        }
    }
}

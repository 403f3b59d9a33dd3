//! Read path: multi-field, fuzzy, filtered, paginated search over a built
//! `FundIndex`. Never mutates index state.

use crate::classifier::tokenize;
use crate::index::FundIndex;
use crate::{FundEntity, Plan, RiskTier, SchemeCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Bound;
use std::time::{Duration, Instant};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 100;

/// Fuzzy matching is only attempted for query tokens of this length or more,
/// and only within edit distance one.
const FUZZY_MIN_LEN: usize = 4;
const FUZZY_MAX_DISTANCE: usize = 1;

const WEIGHT_EXACT_NAME: u32 = 100;
const WEIGHT_NAME_PREFIX: u32 = 50;
const WEIGHT_NAME_SUBSTRING: u32 = 25;
const WEIGHT_HOUSE_SUBSTRING: u32 = 15;
const WEIGHT_CATEGORY_SUBSTRING: u32 = 10;

/// Query filters. Empty vectors mean "no constraint" for that dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub search_text: Option<String>,
    pub fund_houses: Vec<String>,
    /// Matches sub-category bucket names ("Mid Cap") or coarse category
    /// names ("Equity").
    pub categories: Vec<String>,
    pub plans: Vec<Plan>,
    pub risk_tiers: Vec<RiskTier>,
    pub offset: usize,
    /// Page size, clamped to `1..=MAX_LIMIT`; defaults to `DEFAULT_LIMIT`.
    pub limit: Option<usize>,
}

impl SearchFilters {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            search_text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// One ranked, paginated page of matches. Ordering is deterministic: score
/// descending with ascending scheme code as the tie-break, or ascending
/// scheme name when no query text was given.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub funds: Vec<FundEntity>,
    pub total_matches: usize,
    pub has_more: bool,
    pub took: Duration,
}

pub fn search(index: &FundIndex, filters: &SearchFilters) -> SearchResult {
    let start = Instant::now();

    let query_tokens: Vec<String> = filters
        .search_text
        .as_deref()
        .map(tokenize)
        .unwrap_or_default();

    // Candidate generation: OR semantics across query tokens, or the whole
    // catalog when no text was given.
    let mut candidates: BTreeSet<SchemeCode> = if query_tokens.is_empty() {
        index.scheme_codes().collect()
    } else {
        let mut set = BTreeSet::new();
        for qt in &query_tokens {
            collect_token_candidates(index, qt, &mut set);
        }
        set
    };

    if !filters.fund_houses.is_empty() {
        let allowed = house_bucket_union(index, &filters.fund_houses);
        candidates = candidates.intersection(&allowed).copied().collect();
    }
    if !filters.categories.is_empty() {
        let allowed = category_bucket_union(index, &filters.categories);
        candidates = candidates.intersection(&allowed).copied().collect();
    }
    if !filters.plans.is_empty() {
        candidates.retain(|c| index.get(*c).is_some_and(|e| filters.plans.contains(&e.plan)));
    }
    if !filters.risk_tiers.is_empty() {
        candidates
            .retain(|c| index.get(*c).is_some_and(|e| filters.risk_tiers.contains(&e.risk_tier)));
    }

    let total_matches = candidates.len();

    let mut ordered: Vec<&FundEntity> = candidates.iter().filter_map(|c| index.get(*c)).collect();
    if query_tokens.is_empty() {
        ordered.sort_by(|a, b| {
            a.scheme_name
                .cmp(&b.scheme_name)
                .then(a.scheme_code.cmp(&b.scheme_code))
        });
    } else {
        let mut scored: Vec<(u32, &FundEntity)> = ordered
            .into_iter()
            .map(|e| (score(e, &query_tokens), e))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.scheme_code.cmp(&b.1.scheme_code)));
        ordered = scored.into_iter().map(|(_, e)| e).collect();
    }

    let limit = filters.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let funds: Vec<FundEntity> = ordered
        .into_iter()
        .skip(filters.offset)
        .take(limit)
        .cloned()
        .collect();
    let has_more = filters.offset + funds.len() < total_matches;

    let took = start.elapsed();
    tracing::debug!(
        tokens = query_tokens.len(),
        total_matches,
        page = funds.len(),
        took_us = took.as_micros() as u64,
        "search"
    );
    SearchResult {
        funds,
        total_matches,
        has_more,
        took,
    }
}

/// Exact, prefix-in-either-direction, and edit-distance-1 matches for one
/// query token.
fn collect_token_candidates(index: &FundIndex, qt: &str, out: &mut BTreeSet<SchemeCode>) {
    // Indexed tokens having `qt` as a prefix (exact hit included): a single
    // range scan over the ordered vocabulary.
    for (token, bucket) in index
        .token_index
        .range::<str, _>((Bound::Included(qt), Bound::Unbounded))
    {
        if !token.starts_with(qt) {
            break;
        }
        out.extend(bucket.iter().copied());
    }

    // Indexed tokens that are themselves prefixes of `qt`.
    let chars: Vec<char> = qt.chars().collect();
    for len in 1..chars.len() {
        let prefix: String = chars[..len].iter().collect();
        if let Some(bucket) = index.token_index.get(&prefix) {
            out.extend(bucket.iter().copied());
        }
    }

    // Fuzzy: bounded vocabulary scan, cheap length pre-filter first. The
    // pre-filter counts chars, not bytes, to agree with the char-based
    // distance below.
    if chars.len() >= FUZZY_MIN_LEN {
        for (token, bucket) in &index.token_index {
            if token.chars().count().abs_diff(chars.len()) > FUZZY_MAX_DISTANCE {
                continue;
            }
            if within_edit_distance(qt, token, FUZZY_MAX_DISTANCE) {
                out.extend(bucket.iter().copied());
            }
        }
    }
}

fn house_bucket_union(index: &FundIndex, values: &[String]) -> BTreeSet<SchemeCode> {
    let mut out = BTreeSet::new();
    for v in values {
        if let Some(bucket) = index.house_index.get(v) {
            out.extend(bucket.iter().copied());
        }
    }
    out
}

fn category_bucket_union(index: &FundIndex, values: &[String]) -> BTreeSet<SchemeCode> {
    let mut out = BTreeSet::new();
    for v in values {
        if let Some(bucket) = index.category_index.get(v) {
            out.extend(bucket.iter().copied());
            continue;
        }
        // Coarse category name: union every sub-category bucket whose
        // entities carry it. A bucket is homogeneous, so one representative
        // suffices.
        for bucket in index.category_index.values() {
            let Some(&code) = bucket.iter().next() else {
                continue;
            };
            if index
                .get(code)
                .is_some_and(|e| e.category.eq_ignore_ascii_case(v))
            {
                out.extend(bucket.iter().copied());
            }
        }
    }
    out
}

/// Per query token, only the highest applicable contribution counts; token
/// scores are summed over the query.
fn score(entity: &FundEntity, query_tokens: &[String]) -> u32 {
    let name = entity.scheme_name.to_lowercase();
    let house = entity.fund_house.to_lowercase();
    let category = entity.category.to_lowercase();
    let sub_category = entity.sub_category.to_lowercase();

    let mut total = 0;
    for qt in query_tokens {
        total += if name == *qt {
            WEIGHT_EXACT_NAME
        } else if name.starts_with(qt.as_str()) {
            WEIGHT_NAME_PREFIX
        } else if name.contains(qt.as_str()) {
            WEIGHT_NAME_SUBSTRING
        } else if house.contains(qt.as_str()) {
            WEIGHT_HOUSE_SUBSTRING
        } else if category.contains(qt.as_str()) || sub_category.contains(qt.as_str()) {
            WEIGHT_CATEGORY_SUBSTRING
        } else {
            0
        };
    }
    total
}

/// Two-row Levenshtein with a band cutoff; char based, so multibyte names
/// are compared per character.
fn within_edit_distance(a: &str, b: &str, max: usize) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return false;
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        let mut row_min = curr[0];
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            row_min = row_min.min(curr[j]);
        }
        if row_min > max {
            return false;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()] <= max
}

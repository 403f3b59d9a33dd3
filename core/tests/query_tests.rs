use fundex_core::index::FundIndex;
use fundex_core::loader::load_catalog;
use fundex_core::query::{search, SearchFilters};
use std::io::Cursor;

fn catalog_json(records: &[(u32, &str)]) -> String {
    let array: Vec<serde_json::Value> = records
        .iter()
        .map(|(code, name)| serde_json::json!({"schemeCode": code, "schemeName": name}))
        .collect();
    serde_json::to_string(&array).unwrap()
}

fn build(records: &[(u32, &str)]) -> FundIndex {
    load_catalog(Cursor::new(catalog_json(records))).unwrap()
}

fn sample_index() -> FundIndex {
    build(&[
        (1, "HDFC Large Cap Fund Direct Growth"),
        (2, "HDFC Mid Cap Fund Regular Growth"),
        (3, "SBI Liquid Fund Direct Growth"),
        (4, "Axis Small Cap Fund Direct IDCW"),
        (5, "ICICI Prudential Corporate Bond Fund Regular Growth"),
    ])
}

#[test]
fn text_plus_house_filter_returns_both_hdfc_schemes() {
    let index = sample_index();
    let result = search(
        &index,
        &SearchFilters {
            search_text: Some("hdfc".into()),
            fund_houses: vec!["HDFC Mutual Fund".into()],
            ..Default::default()
        },
    );
    let mut codes: Vec<u32> = result.funds.iter().map(|f| f.scheme_code).collect();
    codes.sort_unstable();
    assert_eq!(codes, vec![1, 2]);
    for f in &result.funds {
        assert_eq!(f.fund_house, "HDFC Mutual Fund");
    }
}

#[test]
fn text_plus_category_filter_narrows_to_mid_cap() {
    let index = sample_index();
    let result = search(
        &index,
        &SearchFilters {
            search_text: Some("hdfc".into()),
            categories: vec!["Mid Cap".into()],
            ..Default::default()
        },
    );
    let codes: Vec<u32> = result.funds.iter().map(|f| f.scheme_code).collect();
    assert_eq!(codes, vec![2]);
}

#[test]
fn coarse_category_filter_matches_every_equity_scheme() {
    let index = sample_index();
    let result = search(
        &index,
        &SearchFilters {
            categories: vec!["Equity".into()],
            ..Default::default()
        },
    );
    let mut codes: Vec<u32> = result.funds.iter().map(|f| f.scheme_code).collect();
    codes.sort_unstable();
    assert_eq!(codes, vec![1, 2, 4]);
}

#[test]
fn joined_word_query_still_matches_split_name() {
    // "midcap" has the indexed prefix token "mid" as its own prefix.
    let index = sample_index();
    let result = search(&index, &SearchFilters::text("midcap"));
    assert!(result.funds.iter().any(|f| f.scheme_code == 2));
}

#[test]
fn fuzzy_matching_tolerates_one_edit() {
    // "xiquid" shares no stored prefix with "liquid"; only the
    // edit-distance-1 rule can produce the candidate.
    let index = sample_index();
    let result = search(&index, &SearchFilters::text("xiquid"));
    assert!(result.funds.iter().any(|f| f.scheme_code == 3));

    // Below the four-character fuzzy threshold nothing fires.
    let result = search(&index, &SearchFilters::text("xap"));
    assert_eq!(result.total_matches, 0);
}

#[test]
fn fuzzy_length_prefilter_counts_chars_not_bytes() {
    // "crédit" is seven bytes but six chars; dropping the é leaves "crdit",
    // five chars and five bytes. A byte-length pre-filter would see a gap of
    // two and never reach the char-based distance check.
    let index = build(&[(8, "Crédit Value Fund Regular Growth")]);
    let result = search(&index, &SearchFilters::text("crdit"));
    assert!(result.funds.iter().any(|f| f.scheme_code == 8));
}

#[test]
fn index_coverage_via_own_tokens_and_filters() {
    let index = sample_index();
    for entity in index.entities() {
        let token = entity
            .search_tokens
            .iter()
            .next()
            .expect("classified entity always carries tokens");
        let by_token = search(&index, &SearchFilters::text(token.clone()));
        assert!(
            by_token.funds.iter().any(|f| f.scheme_code == entity.scheme_code),
            "scheme {} unreachable via token {token:?}",
            entity.scheme_code
        );

        let by_filters = search(
            &index,
            &SearchFilters {
                fund_houses: vec![entity.fund_house.clone()],
                categories: vec![entity.sub_category.clone()],
                ..Default::default()
            },
        );
        assert!(by_filters
            .funds
            .iter()
            .any(|f| f.scheme_code == entity.scheme_code));
    }
}

#[test]
fn plan_and_risk_filters_are_predicate_checks() {
    let index = sample_index();
    let direct = search(
        &index,
        &SearchFilters {
            plans: vec![fundex_core::Plan::Direct],
            ..Default::default()
        },
    );
    let mut codes: Vec<u32> = direct.funds.iter().map(|f| f.scheme_code).collect();
    codes.sort_unstable();
    assert_eq!(codes, vec![1, 3, 4]);

    let very_high = search(
        &index,
        &SearchFilters {
            risk_tiers: vec![fundex_core::RiskTier::VeryHigh],
            ..Default::default()
        },
    );
    let codes: Vec<u32> = very_high.funds.iter().map(|f| f.scheme_code).collect();
    assert_eq!(codes, vec![4]);
}

#[test]
fn empty_candidate_set_is_a_well_formed_result() {
    let index = sample_index();
    let result = search(&index, &SearchFilters::text("zzzzzzz"));
    assert_eq!(result.total_matches, 0);
    assert!(result.funds.is_empty());
    assert!(!result.has_more);
}

#[test]
fn no_text_sorts_by_scheme_name() {
    let index = sample_index();
    let result = search(&index, &SearchFilters::default());
    let names: Vec<&str> = result.funds.iter().map(|f| f.scheme_name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert_eq!(result.total_matches, 5);
}

#[test]
fn equal_scores_break_ties_by_scheme_code() {
    let index = build(&[
        (30, "Tata Flexi Cap Fund Direct Growth"),
        (10, "Tata Flexi Cap Fund Regular Growth"),
        (20, "Tata Flexi Cap Fund Direct IDCW"),
    ]);
    let result = search(&index, &SearchFilters::text("flexi"));
    let codes: Vec<u32> = result.funds.iter().map(|f| f.scheme_code).collect();
    assert_eq!(codes, vec![10, 20, 30]);
}

#[test]
fn pagination_reproduces_the_full_ranking_exactly_once() {
    let records: Vec<(u32, String)> = (1..=23)
        .map(|i| (i, format!("Fund Number {i:02} Multi Cap Growth")))
        .collect();
    let borrowed: Vec<(u32, &str)> = records.iter().map(|(c, n)| (*c, n.as_str())).collect();
    let index = build(&borrowed);

    let full = search(
        &index,
        &SearchFilters {
            search_text: Some("fund".into()),
            limit: Some(100),
            ..Default::default()
        },
    );
    assert_eq!(full.total_matches, 23);
    assert!(!full.has_more);

    let limit = 4;
    let mut paged = Vec::new();
    let mut offset = 0;
    loop {
        let page = search(
            &index,
            &SearchFilters {
                search_text: Some("fund".into()),
                offset,
                limit: Some(limit),
                ..Default::default()
            },
        );
        assert_eq!(page.total_matches, 23);
        let expect_more = offset + page.funds.len() < 23;
        assert_eq!(page.has_more, expect_more);
        paged.extend(page.funds.iter().map(|f| f.scheme_code));
        if !page.has_more {
            break;
        }
        offset += limit;
    }
    let full_codes: Vec<u32> = full.funds.iter().map(|f| f.scheme_code).collect();
    assert_eq!(paged, full_codes);
}

#[test]
fn queries_do_not_mutate_the_index() {
    let index = sample_index();
    let before = index.len();
    search(&index, &SearchFilters::text("hdfc"));
    search(
        &index,
        &SearchFilters {
            categories: vec!["Liquid".into()],
            ..Default::default()
        },
    );
    assert_eq!(index.len(), before);
}

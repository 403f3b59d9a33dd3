use fundex_core::classifier::classify;
use fundex_core::{InvestmentOption, Plan, RawFundRecord};

fn raw(code: u32, name: &str) -> RawFundRecord {
    RawFundRecord {
        scheme_code: code,
        scheme_name: name.to_string(),
        isin_growth: None,
        isin_div_reinvestment: None,
    }
}

#[test]
fn classification_is_total() {
    let names = [
        "HDFC Large Cap Fund Direct Growth",
        "???",
        "----",
        "42",
        "フィデリティ・ジャパン",
        "Scheme with no recognizable words whatsoever xyzzy",
        "ICICI Prudential Ultra Short Term Fund Direct IDCW Reinvestment",
        "A",
    ];
    for (i, name) in names.iter().enumerate() {
        let e = classify(&raw(i as u32 + 1, name));
        assert!(!e.fund_house.is_empty(), "{name}");
        assert!(!e.category.is_empty(), "{name}");
        assert!(!e.sub_category.is_empty(), "{name}");
        // Plan and option always resolve to a concrete variant.
        let _ = (e.plan, e.option, e.risk_tier);
    }
}

#[test]
fn classification_is_deterministic() {
    let record = raw(77, "SBI Small Cap Fund Direct Plan Growth");
    assert_eq!(classify(&record), classify(&record));
}

#[test]
fn fallback_entity_is_fully_defaulted() {
    let e = classify(&raw(5, "Totally Unknowable Scheme"));
    assert_eq!(e.fund_house, "Others");
    assert_eq!(e.category, "Others");
    assert_eq!(e.sub_category, "Miscellaneous");
    assert_eq!(e.plan, Plan::Regular);
    assert_eq!(e.option, InvestmentOption::Growth);
}

#[test]
fn isin_fields_pass_through_untouched() {
    let mut record = raw(9, "Mirae Asset Large Cap Fund Direct Growth");
    record.isin_growth = Some("INF769K01AX2".into());
    let e = classify(&record);
    assert_eq!(e.isin_growth.as_deref(), Some("INF769K01AX2"));
    assert!(e.isin_div_reinvestment.is_none());
}

#[test]
fn loose_fallbacks_use_coarse_keywords() {
    let equity = classify(&raw(10, "Some Growth Scheme Series II"));
    assert_eq!(equity.category, "Equity");
    assert_eq!(equity.sub_category, "Multi Cap");

    let debt = classify(&raw(11, "Some Monthly Income Scheme"));
    assert_eq!(debt.category, "Debt");
    assert_eq!(debt.sub_category, "Medium Duration");
}

//! Classification of raw catalog records into normalized fund entities.
//!
//! All decisions are driven by ordered rule tables evaluated top-down; the
//! first matching rule wins. Table order is load-bearing: specific patterns
//! ("large & mid cap", "banking & psu", "ultra short") must be tried before
//! the coarser ones they would otherwise fall into.
//!
//! `classify` is total: a record that matches nothing resolves to the
//! documented defaults (Others / Regular / Growth), never an error.

use crate::{FundEntity, InvestmentOption, Plan, RawFundRecord, RiskTier};
use lazy_static::lazy_static;
use regex::{Regex, RegexSet};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

pub const FALLBACK_HOUSE: &str = "Others";
pub const FALLBACK_CATEGORY: &str = "Others";
pub const FALLBACK_SUB_CATEGORY: &str = "Miscellaneous";

/// Ordered fund-house rules: regex pattern over the lower-cased scheme name,
/// canonical house name. Short brand tokens are word-boundary anchored so
/// e.g. "uti" does not fire inside "solution".
const HOUSE_RULES: &[(&str, &str)] = &[
    (r"hdfc", "HDFC Mutual Fund"),
    (r"icici", "ICICI Prudential Mutual Fund"),
    (r"\bsbi\b", "SBI Mutual Fund"),
    (r"\baxis\b", "Axis Mutual Fund"),
    (r"kotak", "Kotak Mahindra Mutual Fund"),
    (r"aditya birla|birla sun ?life|\babsl\b", "Aditya Birla Sun Life Mutual Fund"),
    (r"nippon|reliance", "Nippon India Mutual Fund"),
    (r"\buti\b", "UTI Mutual Fund"),
    (r"\bdsp\b", "DSP Mutual Fund"),
    (r"\btata\b", "Tata Mutual Fund"),
    (r"franklin|templeton", "Franklin Templeton Mutual Fund"),
    (r"mirae", "Mirae Asset Mutual Fund"),
    (r"motilal oswal", "Motilal Oswal Mutual Fund"),
    (r"parag parikh|ppfas", "PPFAS Mutual Fund"),
    (r"\bquant\b", "Quant Mutual Fund"),
    (r"quantum", "Quantum Mutual Fund"),
    (r"edelweiss", "Edelweiss Mutual Fund"),
    (r"invesco", "Invesco Mutual Fund"),
    (r"canara robeco|\bcanara\b", "Canara Robeco Mutual Fund"),
    (r"bandhan|\bidfc\b", "Bandhan Mutual Fund"),
    (r"\bhsbc\b", "HSBC Mutual Fund"),
    (r"\blic\b", "LIC Mutual Fund"),
    (r"sundaram", "Sundaram Mutual Fund"),
    (r"\bpgim\b", "PGIM India Mutual Fund"),
    (r"baroda", "Baroda BNP Paribas Mutual Fund"),
    (r"\bunion\b", "Union Mutual Fund"),
    (r"bank of india|\bboi\b", "Bank of India Mutual Fund"),
    (r"\bjm\b", "JM Financial Mutual Fund"),
    (r"mahindra manulife|mahindra", "Mahindra Manulife Mutual Fund"),
    (r"\biti\b", "ITI Mutual Fund"),
    (r"360 one|\biifl\b", "360 ONE Mutual Fund"),
    (r"whiteoak|white oak", "WhiteOak Capital Mutual Fund"),
    (r"\bnavi\b", "Navi Mutual Fund"),
    (r"samco", "Samco Mutual Fund"),
    (r"shriram", "Shriram Mutual Fund"),
    (r"\btrust\b", "Trust Mutual Fund"),
    (r"helios", "Helios Mutual Fund"),
    (r"zerodha", "Zerodha Mutual Fund"),
    (r"groww", "Groww Mutual Fund"),
    (r"bajaj", "Bajaj Finserv Mutual Fund"),
];

/// Ordered category rules: regex over the lower-cased scheme name, then
/// (category, sub-category). Most specific first.
const CATEGORY_RULES: &[(&str, &str, &str)] = &[
    // Equity, multi-word buckets before their single-word fragments.
    (r"large\s*(&|and)\s*mid\s*cap", "Equity", "Large & Mid Cap"),
    (r"small\s*cap", "Equity", "Small Cap"),
    (r"mid\s*cap", "Equity", "Mid Cap"),
    (r"large\s*cap|blue\s*chip", "Equity", "Large Cap"),
    (r"flexi\s*cap", "Equity", "Flexi Cap"),
    (r"multi\s*cap", "Equity", "Multi Cap"),
    (r"\belss\b|tax\s*saver|tax\s*relief|long\s*term\s*equity", "Equity", "ELSS"),
    (r"focus(s)?ed", "Equity", "Focused"),
    (r"\bvalue\b|\bcontra\b", "Equity", "Value/Contra"),
    (r"dividend\s*yield", "Equity", "Dividend Yield"),
    // Debt "banking & psu" must precede the sectoral banking rule.
    (r"banking\s*(&|and)\s*psu", "Debt", "Banking & PSU"),
    (
        r"sectoral|thematic|banking|pharma|healthcare|infrastructure|technology|digital|consumption|\bfmcg\b|energy|transportation|\bmnc\b|\besg\b",
        "Equity",
        "Sectoral/Thematic",
    ),
    // Hybrid before the loose equity/debt fallbacks.
    (r"arbitrage", "Hybrid", "Arbitrage"),
    (r"aggressive\s*hybrid|equity\s*hybrid", "Hybrid", "Aggressive Hybrid"),
    (r"conservative\s*hybrid", "Hybrid", "Conservative Hybrid"),
    (r"balanced\s*advantage|dynamic\s*asset", "Hybrid", "Balanced Advantage"),
    (r"balanced|hybrid", "Hybrid", "Balanced Hybrid"),
    // Debt. "ultra short" before "short", ELSS already consumed
    // "long term equity" above.
    (r"overnight", "Debt", "Overnight"),
    (r"liquid", "Debt", "Liquid"),
    (r"ultra\s*short", "Debt", "Ultra Short Duration"),
    (r"short\s*(term|duration)", "Debt", "Short Duration"),
    (r"medium\s*(term|duration)", "Debt", "Medium Duration"),
    (r"long\s*(term|duration)", "Debt", "Long Duration"),
    (r"corporate\s*bond", "Debt", "Corporate Bond"),
    (r"gilt|g[\s-]*sec|government\s*sec", "Debt", "Gilt"),
    (r"dynamic\s*bond", "Debt", "Dynamic Bond"),
    (r"money\s*market", "Debt", "Money Market"),
    (r"credit\s*risk", "Debt", "Credit Risk"),
    // Passive schemes are common in the catalog and match nothing above.
    (r"index|nifty|sensex|\betf\b|exchange\s*traded", "Others", "Index/ETF"),
    (r"\bgold\b|silver", "Others", "Commodity"),
    (r"fund\s*of\s*fund|\bfof\b", "Others", "FoF"),
];

lazy_static! {
    static ref HOUSE_SET: RegexSet =
        RegexSet::new(HOUSE_RULES.iter().map(|(p, _)| *p)).expect("valid house rules");
    static ref CATEGORY_SET: RegexSet =
        RegexSet::new(CATEGORY_RULES.iter().map(|(p, _, _)| *p)).expect("valid category rules");
    static ref WORD: Regex = Regex::new(r"(?u)[\p{L}\p{N}]+").expect("valid word regex");
}

/// Longest stored prefix per token; prefix search beyond this length falls
/// back to the query-side vocabulary scan.
pub const MAX_TOKEN_PREFIX: usize = 6;
const MIN_TOKEN_PREFIX: usize = 3;

/// Map one raw record to a normalized entity. Never fails; unmatched
/// records resolve to the documented fallbacks.
pub fn classify(raw: &RawFundRecord) -> FundEntity {
    let name = normalize(&raw.scheme_name);

    let fund_house = HOUSE_SET
        .matches(&name)
        .iter()
        .min()
        .map(|i| HOUSE_RULES[i].1)
        .unwrap_or(FALLBACK_HOUSE)
        .to_string();

    let (category, sub_category) = match CATEGORY_SET.matches(&name).iter().min() {
        Some(i) => (CATEGORY_RULES[i].1, CATEGORY_RULES[i].2),
        None => loose_category(&name),
    };

    let plan = if name.contains("direct") {
        Plan::Direct
    } else {
        Plan::Regular
    };

    let option = if name.contains("dividend") || name.contains("idcw") {
        if name.contains("reinvest") {
            InvestmentOption::IdcwReinvestment
        } else {
            InvestmentOption::IdcwPayout
        }
    } else {
        InvestmentOption::Growth
    };

    let risk_tier = risk_tier_for(category, sub_category);
    let search_tokens = search_tokens(&name, &fund_house, category, sub_category);

    FundEntity {
        scheme_code: raw.scheme_code,
        scheme_name: raw.scheme_name.trim().to_string(),
        fund_house,
        category: category.to_string(),
        sub_category: sub_category.to_string(),
        plan,
        option,
        risk_tier,
        search_tokens,
        isin_growth: raw.isin_growth.clone(),
        isin_div_reinvestment: raw.isin_div_reinvestment.clone(),
    }
}

/// Loose keyword fallback when no table rule fired.
fn loose_category(name: &str) -> (&'static str, &'static str) {
    if name.contains("equity") || name.contains("growth") {
        ("Equity", "Multi Cap")
    } else if name.contains("income") || name.contains("debt") || name.contains("bond") {
        ("Debt", "Medium Duration")
    } else {
        (FALLBACK_CATEGORY, FALLBACK_SUB_CATEGORY)
    }
}

/// Fixed ordinal risk mapping. Within Equity: Small Cap and Sectoral above
/// Mid Cap above Large Cap; Equity above Hybrid above Debt overall.
fn risk_tier_for(category: &str, sub_category: &str) -> RiskTier {
    match (category, sub_category) {
        ("Debt", "Overnight") | ("Debt", "Liquid") => RiskTier::Low,
        ("Debt", "Ultra Short Duration")
        | ("Debt", "Short Duration")
        | ("Debt", "Money Market")
        | ("Hybrid", "Arbitrage") => RiskTier::ModeratelyLow,
        ("Debt", "Credit Risk") => RiskTier::ModeratelyHigh,
        ("Debt", _) | ("Hybrid", "Conservative Hybrid") => RiskTier::Moderate,
        ("Hybrid", _) | ("Equity", "Large Cap") => RiskTier::ModeratelyHigh,
        ("Equity", "Small Cap") | ("Equity", "Sectoral/Thematic") => RiskTier::VeryHigh,
        ("Equity", _) | ("Others", "Index/ETF") | ("Others", "Commodity") => RiskTier::High,
        _ => RiskTier::Moderate,
    }
}

/// NFKC-normalize and lower-case.
fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Word tokens from a normalized string.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(&normalize(text))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn search_tokens(name: &str, house: &str, category: &str, sub_category: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let sources = [
        name.to_string(),
        normalize(house),
        normalize(category),
        normalize(sub_category),
    ];
    for source in &sources {
        for m in WORD.find_iter(source) {
            add_with_prefixes(&mut tokens, m.as_str());
        }
    }
    tokens
}

/// Insert a word plus, for words of length >= 3, each prefix of length
/// 3..=6. Prefix search then needs no per-query substring scan for short
/// queries.
fn add_with_prefixes(tokens: &mut BTreeSet<String>, word: &str) {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() >= MIN_TOKEN_PREFIX {
        let upto = chars.len().min(MAX_TOKEN_PREFIX);
        for len in MIN_TOKEN_PREFIX..=upto {
            tokens.insert(chars[..len].iter().collect());
        }
    }
    tokens.insert(word.to_string());
}

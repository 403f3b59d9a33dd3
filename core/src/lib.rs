pub mod classifier;
pub mod index;
pub mod loader;
pub mod persist;
pub mod query;
pub mod stream;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier of a fund scheme in the source catalog.
pub type SchemeCode = u32;

/// One flat record from the source catalog stream. Not retained after
/// classification; ISIN fields are carried through uninterpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFundRecord {
    #[serde(rename = "schemeCode")]
    pub scheme_code: SchemeCode,
    #[serde(rename = "schemeName")]
    pub scheme_name: String,
    #[serde(rename = "isinGrowth", default)]
    pub isin_growth: Option<String>,
    #[serde(rename = "isinDivReinvestment", default)]
    pub isin_div_reinvestment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plan {
    Direct,
    Regular,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Direct => write!(f, "Direct"),
            Plan::Regular => write!(f, "Regular"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestmentOption {
    Growth,
    IdcwPayout,
    IdcwReinvestment,
}

impl fmt::Display for InvestmentOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvestmentOption::Growth => write!(f, "Growth"),
            InvestmentOption::IdcwPayout => write!(f, "IDCW Payout"),
            InvestmentOption::IdcwReinvestment => write!(f, "IDCW Reinvestment"),
        }
    }
}

/// Ordinal risk level derived from the category taxonomy.
/// Ordering is meaningful: `Low < ... < VeryHigh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    ModeratelyLow,
    Moderate,
    ModeratelyHigh,
    High,
    VeryHigh,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Low => "Low",
            RiskTier::ModeratelyLow => "Moderately Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::ModeratelyHigh => "Moderately High",
            RiskTier::High => "High",
            RiskTier::VeryHigh => "Very High",
        };
        write!(f, "{s}")
    }
}

/// The indexed unit: one classified fund scheme.
///
/// `scheme_code` is the primary identity; classification is deterministic,
/// so re-deriving an entity from the same raw record yields the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundEntity {
    pub scheme_code: SchemeCode,
    pub scheme_name: String,
    pub fund_house: String,
    pub category: String,
    pub sub_category: String,
    pub plan: Plan,
    pub option: InvestmentOption,
    pub risk_tier: RiskTier,
    /// Normalized word tokens plus bounded prefixes, see `classifier`.
    pub search_tokens: BTreeSet<String>,
    pub isin_growth: Option<String>,
    pub isin_div_reinvestment: Option<String>,
}

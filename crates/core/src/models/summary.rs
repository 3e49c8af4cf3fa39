use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::rate::RateLookup;

/// An amount expressed in the base currency, or the explicit reason it cannot be.
///
/// A foreign amount without a rate is never treated as 0 or as its nominal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BaseAmount {
    /// Every contribution was converted.
    Exact(f64),
    /// Some contributions lacked a rate; `known` sums only the converted ones.
    Partial {
        known: f64,
        missing_currencies: BTreeSet<String>,
    },
    /// No contribution could be converted.
    Unknown { missing_currencies: BTreeSet<String> },
}

impl BaseAmount {
    pub fn unknown(currency: &str) -> Self {
        BaseAmount::Unknown {
            missing_currencies: BTreeSet::from([currency.to_string()]),
        }
    }

    /// The value, only when it is exact.
    pub fn exact(&self) -> Option<f64> {
        match self {
            BaseAmount::Exact(v) => Some(*v),
            _ => None,
        }
    }

    /// The converted part: the full value for `Exact`, the known part for
    /// `Partial`, nothing for `Unknown`.
    pub fn known_part(&self) -> Option<f64> {
        match self {
            BaseAmount::Exact(v) => Some(*v),
            BaseAmount::Partial { known, .. } => Some(*known),
            BaseAmount::Unknown { .. } => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, BaseAmount::Exact(_))
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, BaseAmount::Partial { .. })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, BaseAmount::Unknown { .. })
    }

    /// Currencies whose rate was missing somewhere below this amount.
    pub fn missing_currencies(&self) -> BTreeSet<String> {
        match self {
            BaseAmount::Exact(_) => BTreeSet::new(),
            BaseAmount::Partial {
                missing_currencies, ..
            }
            | BaseAmount::Unknown { missing_currencies } => missing_currencies.clone(),
        }
    }

    /// Add two amounts, keeping track of what could not be converted.
    pub fn add(&self, other: &BaseAmount) -> BaseAmount {
        use BaseAmount::*;
        match (self, other) {
            (Exact(a), Exact(b)) => Exact(a + b),
            (Unknown { missing_currencies: a }, Unknown { missing_currencies: b }) => Unknown {
                missing_currencies: a.union(b).cloned().collect(),
            },
            _ => {
                let mut missing = self.missing_currencies();
                missing.extend(other.missing_currencies());
                Partial {
                    known: self.known_part().unwrap_or(0.0) + other.known_part().unwrap_or(0.0),
                    missing_currencies: missing,
                }
            }
        }
    }

    /// Sum of many amounts. An empty sum is `Exact(0.0)`.
    pub fn sum<'a>(amounts: impl IntoIterator<Item = &'a BaseAmount>) -> BaseAmount {
        amounts
            .into_iter()
            .fold(None, |acc: Option<BaseAmount>, a| match acc {
                None => Some(a.clone()),
                Some(acc) => Some(acc.add(a)),
            })
            .unwrap_or(BaseAmount::Exact(0.0))
    }
}

/// Return on investment in percent. Unknown unless both inputs are exact, and
/// undefined for non-positive invested capital.
pub fn roi(total_profit: &BaseAmount, invested_capital: &BaseAmount) -> Option<f64> {
    let profit = total_profit.exact()?;
    let invested = invested_capital.exact()?;
    (invested > 0.0).then(|| profit / invested * 100.0)
}

/// Base-currency split of unrealized profit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProfitBreakdown {
    /// No gain or loss: nothing to decompose.
    Neutral,
    /// `total == asset + currency`.
    Split {
        total: BaseAmount,
        asset: BaseAmount,
        currency: BaseAmount,
    },
}

impl ProfitBreakdown {
    pub fn is_neutral(&self) -> bool {
        matches!(self, ProfitBreakdown::Neutral)
    }

    /// Total unrealized profit, with `Neutral` read as exactly zero.
    pub fn total_or_zero(&self) -> BaseAmount {
        match self {
            ProfitBreakdown::Neutral => BaseAmount::Exact(0.0),
            ProfitBreakdown::Split { total, .. } => total.clone(),
        }
    }

    /// Component-wise sum over children; neutral children contribute nothing.
    pub fn combine<'a>(parts: impl IntoIterator<Item = &'a ProfitBreakdown>) -> ProfitBreakdown {
        let mut totals = Vec::new();
        let mut assets = Vec::new();
        let mut currencies = Vec::new();

        for part in parts {
            if let ProfitBreakdown::Split {
                total,
                asset,
                currency,
            } = part
            {
                totals.push(total);
                assets.push(asset);
                currencies.push(currency);
            }
        }

        if totals.is_empty() {
            return ProfitBreakdown::Neutral;
        }

        ProfitBreakdown::Split {
            total: BaseAmount::sum(totals),
            asset: BaseAmount::sum(assets),
            currency: BaseAmount::sum(currencies),
        }
    }
}

/// Original-currency amounts of one currency bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginalAmounts {
    pub original_amount: f64,
    pub calculated_amount: f64,
    pub active_capital: f64,
    pub current_value: f64,
    pub amount_unit: Option<f64>,
}

impl OriginalAmounts {
    pub fn unrealized_profit(&self) -> f64 {
        self.current_value - self.active_capital
    }

    /// Add `other` into this bucket. Units are summed as-is; callers drop
    /// them when the bucket spans more than one asset.
    pub fn accumulate(&mut self, other: &OriginalAmounts) {
        self.original_amount += other.original_amount;
        self.calculated_amount += other.calculated_amount;
        self.active_capital += other.active_capital;
        self.current_value += other.current_value;
        self.amount_unit = match (self.amount_unit, other.amount_unit) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }
}

/// Rate information carried by a summary node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RateInfo {
    /// Every position below this node used the same lookup.
    Uniform(RateLookup),
    /// Children were valued with different rates.
    Mixed,
}

/// Grouping key of a summary node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryLevel {
    Wallet,
    Instrument,
    Asset,
    Goal,
    Total,
}

impl std::fmt::Display for SummaryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryLevel::Wallet => write!(f, "Wallet"),
            SummaryLevel::Instrument => write!(f, "Instrument"),
            SummaryLevel::Asset => write!(f, "Asset"),
            SummaryLevel::Goal => write!(f, "Goal"),
            SummaryLevel::Total => write!(f, "Total"),
        }
    }
}

/// How the summary tree is rooted. Every variant is the same data re-grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBy {
    /// Wallet → Instrument → Asset
    WalletFirst,
    /// Goal → Wallet → Asset
    GoalFirst,
    /// Any order of Wallet/Instrument/Asset/Goal levels
    Custom(Vec<SummaryLevel>),
}

impl GroupBy {
    pub fn levels(&self) -> Vec<SummaryLevel> {
        match self {
            GroupBy::WalletFirst => vec![
                SummaryLevel::Wallet,
                SummaryLevel::Instrument,
                SummaryLevel::Asset,
            ],
            GroupBy::GoalFirst => vec![
                SummaryLevel::Goal,
                SummaryLevel::Wallet,
                SummaryLevel::Asset,
            ],
            GroupBy::Custom(levels) => levels.clone(),
        }
    }
}

/// One node of the summary tree. Wallet, instrument, asset, goal and total
/// nodes share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub level: SummaryLevel,
    pub id: Option<i64>,
    pub name: String,

    /// Set when every position below this node shares one currency.
    pub original_currency: Option<String>,
    pub original_currency_symbol: Option<String>,
    /// Original-currency amounts, one bucket per currency. Buckets of
    /// different currencies are never added together.
    pub by_currency: BTreeMap<String, OriginalAmounts>,

    pub base_currency: String,
    pub active_capital_base_currency: BaseAmount,
    pub current_value_base_currency: BaseAmount,
    pub profit: ProfitBreakdown,
    /// Every contribution ever made, at the rates of its own day.
    pub invested_capital_base_currency: BaseAmount,
    pub realized_profit_base_currency: BaseAmount,
    /// Realized plus unrealized profit.
    pub total_profit_base_currency: BaseAmount,
    /// `total_profit / invested_capital · 100`. `None` unless both are exact
    /// and invested capital is positive.
    pub roi: Option<f64>,
    /// Some position below is priced per unit.
    pub is_trackable: bool,
    pub rate: RateInfo,

    pub children: Vec<Summary>,
}

impl Summary {
    fn single_bucket(&self) -> Option<&OriginalAmounts> {
        match self.by_currency.len() {
            1 => self.by_currency.values().next(),
            _ => None,
        }
    }

    pub fn is_multi_currency(&self) -> bool {
        self.by_currency.len() > 1
    }

    /// Active capital in the original currency (single-currency nodes only).
    pub fn active_capital(&self) -> Option<f64> {
        self.single_bucket().map(|b| b.active_capital)
    }

    /// Current value in the original currency (single-currency nodes only).
    pub fn current_value(&self) -> Option<f64> {
        self.single_bucket().map(|b| b.current_value)
    }

    /// Unrealized profit in the original currency (single-currency nodes only).
    pub fn unrealized_profit(&self) -> Option<f64> {
        self.single_bucket().map(|b| b.unrealized_profit())
    }

    /// `None` when the decomposition is neutral.
    pub fn unrealized_profit_base_currency(&self) -> Option<&BaseAmount> {
        match &self.profit {
            ProfitBreakdown::Split { total, .. } => Some(total),
            ProfitBreakdown::Neutral => None,
        }
    }

    pub fn unrealized_asset_profit_base_currency(&self) -> Option<&BaseAmount> {
        match &self.profit {
            ProfitBreakdown::Split { asset, .. } => Some(asset),
            ProfitBreakdown::Neutral => None,
        }
    }

    pub fn unrealized_currency_profit(&self) -> Option<&BaseAmount> {
        match &self.profit {
            ProfitBreakdown::Split { currency, .. } => Some(currency),
            ProfitBreakdown::Neutral => None,
        }
    }

    pub fn latest_rate(&self) -> Option<f64> {
        match &self.rate {
            RateInfo::Uniform(lookup) => lookup.rate(),
            RateInfo::Mixed => None,
        }
    }

    pub fn latest_rate_date(&self) -> Option<NaiveDate> {
        match &self.rate {
            RateInfo::Uniform(lookup) => lookup.date(),
            RateInfo::Mixed => None,
        }
    }

    /// True when some (but not all) base-currency values below are unknown.
    pub fn is_partial(&self) -> bool {
        self.current_value_base_currency.is_partial()
            || self.active_capital_base_currency.is_partial()
            || self
                .unrealized_profit_base_currency()
                .is_some_and(|t| t.is_partial())
    }

    /// Depth-first search by level and id.
    pub fn find(&self, level: SummaryLevel, id: Option<i64>) -> Option<&Summary> {
        if self.level == level && self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(level, id))
    }
}

/// Result of an aggregation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTree {
    pub owner_id: String,
    pub base_currency: String,
    pub as_of: NaiveDate,
    pub levels: Vec<SummaryLevel>,
    /// Root nodes of the first grouping level, sorted for presentation
    pub nodes: Vec<Summary>,
    /// Overall total across all positions
    pub total: Summary,
}

impl SummaryTree {
    pub fn find(&self, level: SummaryLevel, id: Option<i64>) -> Option<&Summary> {
        self.nodes.iter().find_map(|n| n.find(level, id))
    }
}

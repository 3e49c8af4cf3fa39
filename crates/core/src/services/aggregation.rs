use chrono::NaiveDate;
use log::{debug, warn};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::currency::normalize_code;
use crate::models::position::{EntityRef, PositionRow};
use crate::models::rate::RateLookup;
use crate::models::summary::{
    roi, BaseAmount, GroupBy, OriginalAmounts, ProfitBreakdown, RateInfo, Summary, SummaryLevel,
    SummaryTree,
};
use crate::storage::traits::{PositionRepository, RateRepository};

/// Name of the node collecting positions without an instrument, asset or goal.
pub const UNASSIGNED: &str = "Unassigned";

/// Builds multi-currency summary trees from the position read model.
///
/// Every position is valued once as a leaf; every grouping (wallet-first,
/// goal-first, custom) re-roots the same leaves. Read-only.
pub struct AggregationService {
    positions: Arc<dyn PositionRepository>,
    rates: Arc<dyn RateRepository>,
}

/// Base-currency valuation of one position or of a group of positions.
#[derive(Debug, Clone)]
struct Valuation {
    by_currency: BTreeMap<String, OriginalAmounts>,
    symbol: Option<String>,
    active_capital_base: BaseAmount,
    current_value_base: BaseAmount,
    profit: ProfitBreakdown,
    invested_capital_base: BaseAmount,
    realized_profit_base: BaseAmount,
    trackable: bool,
    /// Asset ids below this valuation; `None` stands for unassigned.
    assets: BTreeSet<Option<i64>>,
    rate: RateInfo,
}

impl AggregationService {
    pub fn new(positions: Arc<dyn PositionRepository>, rates: Arc<dyn RateRepository>) -> Self {
        Self { positions, rates }
    }

    /// Summarize every position of `owner_id` in `base_currency`, valued with
    /// the latest rates dated on or before `as_of`.
    pub fn summarize(
        &self,
        owner_id: &str,
        base_currency: &str,
        group_by: &GroupBy,
        as_of: NaiveDate,
    ) -> Result<SummaryTree, CoreError> {
        let levels = group_by.levels();
        validate_levels(&levels)?;

        let base = normalize_code(base_currency);
        let rows = self.positions.positions_for_owner(owner_id)?;

        // One lookup per currency, shared by every position in it.
        let mut lookups: HashMap<String, RateLookup> = HashMap::new();
        for row in &rows {
            let currency = normalize_code(&row.original_currency);
            if lookups.contains_key(&currency) {
                continue;
            }
            let lookup = if currency == base {
                RateLookup::SameCurrency
            } else {
                RateLookup::from(self.rates.latest_rate(&currency, &base, as_of)?)
            };
            if lookup.is_missing() {
                warn!("No {currency}/{base} rate on or before {as_of}; {currency} positions stay unconverted");
            }
            lookups.insert(currency, lookup);
        }

        let leaves: Vec<(&PositionRow, Valuation)> = rows
            .iter()
            .map(|row| {
                let currency = normalize_code(&row.original_currency);
                let lookup = lookups.get(&currency).cloned().unwrap_or(RateLookup::Missing);
                (row, value_position(row, &currency, lookup))
            })
            .collect();

        let nodes = build_level(&leaves, &levels, &base);

        let total_valuation = combine(leaves.iter().map(|(_, v)| v));
        let total = into_summary(SummaryLevel::Total, None, "Total".into(), &base, total_valuation, Vec::new());

        debug!(
            "Summarized {} positions for owner {owner_id} in {base} as of {as_of} ({} root nodes)",
            rows.len(),
            nodes.len()
        );

        Ok(SummaryTree {
            owner_id: owner_id.to_string(),
            base_currency: base,
            as_of,
            levels,
            nodes,
            total,
        })
    }
}

fn validate_levels(levels: &[SummaryLevel]) -> Result<(), CoreError> {
    if levels.is_empty() {
        return Err(CoreError::Validation("Grouping needs at least one level".into()));
    }
    for (i, level) in levels.iter().enumerate() {
        if *level == SummaryLevel::Total {
            return Err(CoreError::Validation("Total is not a grouping level".into()));
        }
        if levels[..i].contains(level) {
            return Err(CoreError::Validation(format!("Grouping level {level} appears twice")));
        }
    }
    Ok(())
}

/// Value one position. `currency` is the normalized original currency.
///
/// The split is `Neutral` only when the base-currency profit is exactly zero:
/// a flat position still carries currency profit once the rate has moved.
fn value_position(row: &PositionRow, currency: &str, lookup: RateLookup) -> Valuation {
    let ac = row.active_capital;
    let cv = row.current_value;
    let flat = cv == ac;

    let (active_capital_base, current_value_base, profit) = match &lookup {
        RateLookup::SameCurrency => {
            let gain = cv - ac;
            let profit = if flat {
                ProfitBreakdown::Neutral
            } else {
                ProfitBreakdown::Split {
                    total: BaseAmount::Exact(gain),
                    asset: BaseAmount::Exact(gain),
                    currency: BaseAmount::Exact(0.0),
                }
            };
            (BaseAmount::Exact(ac), BaseAmount::Exact(cv), profit)
        }
        RateLookup::Missing => {
            let unknown = BaseAmount::unknown(currency);
            (unknown.clone(), unknown.clone(), unknown_split(currency))
        }
        RateLookup::Found { rate: r_now, .. } => match row.entry_rate {
            Some(r_entry) => {
                let profit = if flat && *r_now == r_entry {
                    ProfitBreakdown::Neutral
                } else {
                    let asset = if flat { 0.0 } else { (cv - ac) * r_now };
                    let currency_gain = ac * (r_now - r_entry);
                    ProfitBreakdown::Split {
                        total: BaseAmount::Exact(asset + currency_gain),
                        asset: BaseAmount::Exact(asset),
                        currency: BaseAmount::Exact(currency_gain),
                    }
                };
                (BaseAmount::Exact(ac * r_entry), BaseAmount::Exact(cv * r_now), profit)
            }
            None => (
                BaseAmount::unknown(currency),
                BaseAmount::Exact(cv * r_now),
                unknown_split(currency),
            ),
        },
    };

    let amounts = OriginalAmounts {
        original_amount: row.original_amount,
        calculated_amount: row.calculated_amount,
        active_capital: ac,
        current_value: cv,
        amount_unit: row.amount_unit,
    };

    let known_or_unknown = |v: Option<f64>| match v {
        Some(v) => BaseAmount::Exact(v),
        None => BaseAmount::unknown(currency),
    };

    Valuation {
        by_currency: BTreeMap::from([(currency.to_string(), amounts)]),
        symbol: Some(row.original_currency_symbol.clone()),
        active_capital_base,
        current_value_base,
        profit,
        invested_capital_base: known_or_unknown(row.invested_capital_base_currency),
        realized_profit_base: known_or_unknown(row.realized_profit_base_currency),
        trackable: row.trackable,
        assets: BTreeSet::from([row.asset.as_ref().map(|a| a.id)]),
        rate: RateInfo::Uniform(lookup),
    }
}

fn unknown_split(currency: &str) -> ProfitBreakdown {
    ProfitBreakdown::Split {
        total: BaseAmount::unknown(currency),
        asset: BaseAmount::unknown(currency),
        currency: BaseAmount::unknown(currency),
    }
}

/// Roll valuations up into one.
fn combine<'a>(parts: impl Iterator<Item = &'a Valuation> + Clone) -> Valuation {
    let mut by_currency: BTreeMap<String, OriginalAmounts> = BTreeMap::new();
    let mut assets = BTreeSet::new();
    for part in parts.clone() {
        for (currency, amounts) in &part.by_currency {
            by_currency.entry(currency.clone()).or_default().accumulate(amounts);
        }
        assets.extend(part.assets.iter().copied());
    }
    // Units of different assets do not add up.
    if assets.len() > 1 {
        for amounts in by_currency.values_mut() {
            amounts.amount_unit = None;
        }
    }

    let mut symbols = parts.clone().map(|p| p.symbol.clone());
    let first_symbol = symbols.next().flatten();
    let symbol = if symbols.all(|s| s == first_symbol) {
        first_symbol
    } else {
        None
    };

    let mut rates = parts.clone().map(|p| &p.rate);
    let rate = match rates.next() {
        None => RateInfo::Uniform(RateLookup::SameCurrency),
        Some(first) => {
            if rates.all(|r| r == first) {
                first.clone()
            } else {
                RateInfo::Mixed
            }
        }
    };

    Valuation {
        by_currency,
        symbol,
        active_capital_base: BaseAmount::sum(parts.clone().map(|p| &p.active_capital_base)),
        current_value_base: BaseAmount::sum(parts.clone().map(|p| &p.current_value_base)),
        profit: ProfitBreakdown::combine(parts.clone().map(|p| &p.profit)),
        invested_capital_base: BaseAmount::sum(parts.clone().map(|p| &p.invested_capital_base)),
        realized_profit_base: BaseAmount::sum(parts.clone().map(|p| &p.realized_profit_base)),
        trackable: parts.clone().any(|p| p.trackable),
        assets,
        rate,
    }
}

/// Group `leaves` by the first of `levels`, recursing into the rest.
fn build_level(leaves: &[(&PositionRow, Valuation)], levels: &[SummaryLevel], base: &str) -> Vec<Summary> {
    let Some((&level, deeper)) = levels.split_first() else {
        return Vec::new();
    };

    let mut groups: Vec<((Option<i64>, String), Vec<(&PositionRow, Valuation)>)> = Vec::new();
    for (row, valuation) in leaves {
        let key = group_key(row, level);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push((*row, valuation.clone())),
            None => groups.push((key, vec![(*row, valuation.clone())])),
        }
    }

    let mut nodes: Vec<Summary> = groups
        .into_iter()
        .map(|((id, name), members)| {
            let children = build_level(&members, deeper, base);
            let valuation = combine(members.iter().map(|(_, v)| v));
            into_summary(level, id, name, base, valuation, children)
        })
        .collect();

    nodes.sort_by(compare_nodes);
    nodes
}

fn group_key(row: &PositionRow, level: SummaryLevel) -> (Option<i64>, String) {
    let entity: Option<&EntityRef> = match level {
        SummaryLevel::Wallet => Some(&row.wallet),
        SummaryLevel::Instrument => row.instrument.as_ref(),
        SummaryLevel::Asset => row.asset.as_ref(),
        SummaryLevel::Goal => row.goal.as_ref(),
        SummaryLevel::Total => None,
    };
    match entity {
        Some(e) => (Some(e.id), e.name.clone()),
        None => (None, UNASSIGNED.to_string()),
    }
}

fn into_summary(
    level: SummaryLevel,
    id: Option<i64>,
    name: String,
    base: &str,
    valuation: Valuation,
    children: Vec<Summary>,
) -> Summary {
    let single_currency = valuation.by_currency.len() == 1;
    let original_currency = if single_currency {
        valuation.by_currency.keys().next().cloned()
    } else {
        None
    };

    let total_profit = valuation
        .realized_profit_base
        .add(&valuation.profit.total_or_zero());
    let roi = roi(&total_profit, &valuation.invested_capital_base);

    Summary {
        level,
        id,
        name,
        original_currency,
        original_currency_symbol: valuation.symbol.filter(|_| single_currency),
        by_currency: valuation.by_currency,
        base_currency: base.to_string(),
        active_capital_base_currency: valuation.active_capital_base,
        current_value_base_currency: valuation.current_value_base,
        profit: valuation.profit,
        invested_capital_base_currency: valuation.invested_capital_base,
        realized_profit_base_currency: valuation.realized_profit_base,
        total_profit_base_currency: total_profit,
        roi,
        is_trackable: valuation.trackable,
        rate: valuation.rate,
        children,
    }
}

/// Known value descending, unknown values last.
fn desc_known(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn profit_key(node: &Summary) -> Option<f64> {
    match &node.profit {
        ProfitBreakdown::Neutral => Some(0.0),
        ProfitBreakdown::Split { total, .. } => total.known_part(),
    }
}

fn compare_nodes(a: &Summary, b: &Summary) -> Ordering {
    desc_known(
        a.current_value_base_currency.known_part(),
        b.current_value_base_currency.known_part(),
    )
    .then_with(|| desc_known(profit_key(a), profit_key(b)))
    .then_with(|| a.name.cmp(&b.name))
}

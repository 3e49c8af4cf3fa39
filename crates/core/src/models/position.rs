use serde::{Deserialize, Serialize};

/// Reference to a named entity of the upstream bookkeeping (wallet, goal, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: i64,
    pub name: String,
}

impl EntityRef {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One row per distinct wallet × instrument × asset × goal combination that an
/// owner has funds in. Produced by upstream bookkeeping; read-only here.
///
/// All amounts are in `original_currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    pub owner_id: String,
    pub wallet: EntityRef,
    pub instrument: Option<EntityRef>,
    pub asset: Option<EntityRef>,
    pub goal: Option<EntityRef>,

    pub original_currency: String,
    pub original_currency_symbol: String,

    /// Capital put in (cost basis)
    pub original_amount: f64,
    /// Capital after internal movements
    pub calculated_amount: f64,
    /// Capital still deployed; selection between original and calculated
    /// amount is made upstream
    pub active_capital: f64,
    /// Mark-to-market value
    pub current_value: f64,
    /// Quantity held, for unit-priced assets
    pub amount_unit: Option<f64>,

    /// Average base-per-unit rate at which the active capital was deployed.
    /// `None` when upstream could not determine it.
    pub entry_rate: Option<f64>,

    /// Every contribution ever made, converted at the rates of its own day.
    /// `None` when upstream could not price one of them.
    #[serde(default)]
    pub invested_capital_base_currency: Option<f64>,
    /// Gains already taken out, in the base currency.
    #[serde(default)]
    pub realized_profit_base_currency: Option<f64>,
    /// The instrument is priced per unit (gold, shares, coins).
    #[serde(default)]
    pub trackable: bool,
}

impl PositionRow {
    /// Paper gain/loss in the original currency.
    pub fn unrealized_profit(&self) -> f64 {
        self.current_value - self.active_capital
    }
}

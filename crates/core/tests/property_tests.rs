//! Property-based tests for the aggregation engine and rate normalization.
//!
//! These tests verify that the profit decomposition identity, zero-profit
//! suppression and missing-rate propagation hold across generated inputs.

use chrono::NaiveDate;
use proptest::prelude::*;
use std::sync::Arc;

use wealth_ledger_core::models::currency::CurrencyPair;
use wealth_ledger_core::models::position::{EntityRef, PositionRow};
use wealth_ledger_core::models::rate::ExchangeRate;
use wealth_ledger_core::models::summary::{BaseAmount, GroupBy, ProfitBreakdown, SummaryTree};
use wealth_ledger_core::providers::normalize::RateNormalizer;
use wealth_ledger_core::services::aggregation::AggregationService;
use wealth_ledger_core::storage::memory::InMemoryStore;
use wealth_ledger_core::storage::traits::RateRepository;

// =============================================================================
// Generators
// =============================================================================

/// A positive money amount.
fn arb_amount() -> impl Strategy<Value = f64> {
    1.0f64..10_000_000.0
}

/// A positive exchange rate, from crypto-ish tiny to rupiah-ish large.
fn arb_rate() -> impl Strategy<Value = f64> {
    prop_oneof![0.000_01f64..1.0, 1.0f64..100.0, 100.0f64..50_000.0]
}

fn arb_currency() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("USD"), Just("EUR"), Just("SGD")]
}

/// (currency, active_capital, current_value, rate_at_entry)
fn arb_position() -> impl Strategy<Value = (&'static str, f64, f64, f64)> {
    (arb_currency(), arb_amount(), arb_amount(), arb_rate())
}

// =============================================================================
// Helpers
// =============================================================================

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

fn row(idx: usize, currency: &str, active_capital: f64, current_value: f64, entry: f64) -> PositionRow {
    PositionRow {
        owner_id: "owner".into(),
        wallet: EntityRef::new((idx % 3) as i64, format!("Wallet {}", idx % 3)),
        instrument: None,
        asset: Some(EntityRef::new(idx as i64, format!("Asset {idx}"))),
        goal: None,
        original_currency: currency.into(),
        original_currency_symbol: currency.into(),
        original_amount: active_capital,
        calculated_amount: active_capital,
        active_capital,
        current_value,
        amount_unit: None,
        entry_rate: Some(entry),
        invested_capital_base_currency: None,
        realized_profit_base_currency: Some(0.0),
        trackable: false,
    }
}

fn summarize(rows: Vec<PositionRow>, rates: &[(&str, f64)]) -> SummaryTree {
    let store = Arc::new(InMemoryStore::new());
    store.set_positions(rows).unwrap();
    let rows: Vec<ExchangeRate> = rates
        .iter()
        .map(|(from, rate)| ExchangeRate::new(&CurrencyPair::new(from, "IDR").unwrap(), *rate, as_of()))
        .collect();
    store.upsert_rates(&rows).unwrap();
    AggregationService::new(store.clone(), store)
        .summarize("owner", "IDR", &GroupBy::WalletFirst, as_of())
        .unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// asset + currency == total for a single position.
    #[test]
    fn prop_leaf_decomposition_identity(
        active_capital in arb_amount(),
        current_value in arb_amount(),
        rate_at_entry in arb_rate(),
        rate_now in arb_rate(),
    ) {
        prop_assume!(active_capital != current_value);

        let tree = summarize(
            vec![row(0, "USD", active_capital, current_value, rate_at_entry)],
            &[("USD", rate_now)],
        );

        match &tree.total.profit {
            ProfitBreakdown::Split { total, asset, currency } => {
                let (t, a, c) = (total.exact().unwrap(), asset.exact().unwrap(), currency.exact().unwrap());
                prop_assert!(close(t, a + c), "{} != {} + {}", t, a, c);
                let direct = current_value * rate_now - active_capital * rate_at_entry;
                let scale = current_value * rate_now + active_capital * rate_at_entry;
                prop_assert!((t - direct).abs() <= 1e-6 * scale, "{} != {}", t, direct);
            }
            ProfitBreakdown::Neutral => prop_assert!(false, "non-zero profit reported as neutral"),
        }
    }

    /// The identity survives aggregation across wallets and currencies.
    #[test]
    fn prop_identity_holds_on_parents(
        positions in prop::collection::vec(arb_position(), 1..12),
        usd in arb_rate(),
        eur in arb_rate(),
        sgd in arb_rate(),
    ) {
        let rows = positions
            .iter()
            .enumerate()
            .map(|(i, (cur, ac, cv, entry))| row(i, cur, *ac, *cv, *entry))
            .collect();
        let tree = summarize(rows, &[("USD", usd), ("EUR", eur), ("SGD", sgd)]);

        for node in tree.nodes.iter().chain(std::iter::once(&tree.total)) {
            if let ProfitBreakdown::Split { total, asset, currency } = &node.profit {
                let (t, a, c) = (total.exact().unwrap(), asset.exact().unwrap(), currency.exact().unwrap());
                let scale = node.current_value_base_currency.exact().unwrap().abs()
                    + node.active_capital_base_currency.exact().unwrap().abs();
                prop_assert!((t - (a + c)).abs() <= 1e-6 * scale.max(1.0));
            }
        }
    }

    /// A flat position has no asset profit; its currency profit survives.
    #[test]
    fn prop_flat_position_keeps_currency_profit(
        amount in arb_amount(),
        rate_at_entry in arb_rate(),
        rate_now in arb_rate(),
    ) {
        prop_assume!(rate_at_entry != rate_now);
        let tree = summarize(
            vec![row(0, "EUR", amount, amount, rate_at_entry)],
            &[("EUR", rate_now)],
        );

        match &tree.total.profit {
            ProfitBreakdown::Split { total, asset, currency } => {
                prop_assert_eq!(asset.exact(), Some(0.0));
                let expected = amount * (rate_now - rate_at_entry);
                prop_assert!(close(currency.exact().unwrap(), expected));
                prop_assert!(close(total.exact().unwrap(), expected));
            }
            ProfitBreakdown::Neutral => prop_assert!(false, "currency profit dropped"),
        }
    }

    /// Flat in its own currency and priced at the entry rate → Neutral.
    #[test]
    fn prop_zero_base_profit_is_neutral(amount in arb_amount(), rate in arb_rate()) {
        let tree = summarize(vec![row(0, "EUR", amount, amount, rate)], &[("EUR", rate)]);
        prop_assert!(tree.total.profit.is_neutral());
    }

    /// Every fully converted node reports profit == value − capital.
    #[test]
    fn prop_profit_matches_value_minus_capital(
        positions in prop::collection::vec(arb_position(), 1..12),
        flat in prop::collection::vec(any::<bool>(), 12),
        usd in arb_rate(),
        eur in arb_rate(),
        sgd in arb_rate(),
    ) {
        let rows = positions
            .iter()
            .enumerate()
            .map(|(i, (cur, ac, cv, entry))| {
                let cv = if flat[i] { *ac } else { *cv };
                row(i, cur, *ac, cv, *entry)
            })
            .collect();
        let tree = summarize(rows, &[("USD", usd), ("EUR", eur), ("SGD", sgd)]);

        for node in tree.nodes.iter().chain(std::iter::once(&tree.total)) {
            let cv = node.current_value_base_currency.exact().unwrap();
            let ac = node.active_capital_base_currency.exact().unwrap();
            let total = match node.unrealized_profit_base_currency() {
                Some(total) => total.exact().unwrap(),
                None => 0.0,
            };
            prop_assert!((total - (cv - ac)).abs() <= 1e-6 * (cv.abs() + ac.abs()).max(1.0));
        }
    }

    /// Without a rate, nothing is ever reported as an exact base amount.
    #[test]
    fn prop_missing_rate_never_defaults(
        active_capital in arb_amount(),
        current_value in arb_amount(),
        rate_at_entry in arb_rate(),
    ) {
        let tree = summarize(vec![row(0, "SGD", active_capital, current_value, rate_at_entry)], &[]);

        prop_assert!(tree.total.current_value_base_currency.is_unknown());
        prop_assert!(tree.total.active_capital_base_currency.is_unknown());
        if let Some(total) = tree.total.unrealized_profit_base_currency() {
            prop_assert!(total.is_unknown());
        }
    }

    /// Sum of amounts keeps every missing currency and only the known parts.
    #[test]
    fn prop_base_amount_sum_tracks_known_parts(
        values in prop::collection::vec(proptest::option::of(-1_000_000.0f64..1_000_000.0), 1..10),
    ) {
        let amounts: Vec<BaseAmount> = values
            .iter()
            .map(|v| match v {
                Some(v) => BaseAmount::Exact(*v),
                None => BaseAmount::unknown("EUR"),
            })
            .collect();
        let sum = BaseAmount::sum(&amounts);

        let known: Vec<f64> = values.iter().flatten().copied().collect();
        match (known.len(), values.len()) {
            (0, _) => prop_assert!(sum.is_unknown()),
            (k, n) if k == n => prop_assert!(sum.is_exact()),
            _ => prop_assert!(sum.is_partial()),
        }
        if let Some(part) = sum.known_part() {
            prop_assert!(close(part, known.iter().sum()));
        }
    }

    /// Inverted currencies invert; others pass through; twice undoes it.
    #[test]
    fn prop_normalization_direction(raw in arb_rate()) {
        let normalizer = RateNormalizer::new(["IDR"]);

        prop_assert_eq!(normalizer.normalize("USD", raw), raw);
        let once = normalizer.normalize("IDR", raw);
        prop_assert!(close(once, 1.0 / raw));
        prop_assert!(close(normalizer.normalize("IDR", once), raw));
    }
}

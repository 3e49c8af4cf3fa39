//! Pure interpretation of provider payloads: error classification, the
//! single-object vs symbol-map shapes of `/exchange_rate`, and the mapping of
//! reference lists onto the currency universe.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::errors::CoreError;
use crate::models::currency::{normalize_code, Currency, CurrencyKind, CurrencyPair};

use super::traits::{ProviderResponse, ReferenceKind};

const RATE_LIMITED_CODE: i64 = 429;

// ── Twelve Data payload types ───────────────────────────────────────

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<i64>,
    message: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct RateQuote {
    symbol: String,
    rate: RawRate,
}

/// Rates arrive either as JSON numbers or as numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRate {
    Number(f64),
    Text(String),
}

impl RawRate {
    /// Usable rate: finite and strictly positive.
    fn value(&self) -> Option<f64> {
        let v = match self {
            RawRate::Number(n) => *n,
            RawRate::Text(s) => s.trim().parse().ok()?,
        };
        (v.is_finite() && v > 0.0).then_some(v)
    }
}

#[derive(Deserialize)]
struct ReferenceList {
    data: Vec<ReferenceRecord>,
}

#[derive(Deserialize)]
struct ReferenceRecord {
    symbol: String,
    #[serde(default)]
    currency_base: Option<String>,
    #[serde(default)]
    currency_quote: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Raw (provider-direction) rates extracted from one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRates {
    /// Requested pairs with a usable rate, in request order.
    pub found: Vec<(CurrencyPair, f64)>,
    /// Requested pairs absent from the payload or carrying an unusable rate.
    pub missing: Vec<CurrencyPair>,
}

fn malformed(provider: &str, message: impl Into<String>) -> CoreError {
    CoreError::MalformedProviderResponse {
        provider: provider.to_string(),
        message: message.into(),
    }
}

/// Turn non-success statuses and embedded `code` fields into errors.
///
/// HTTP 429 or `code == 429` → `ProviderRateLimited`; anything else that
/// signals failure → `Provider`. Returns the parsed body on success.
pub fn classify(provider: &str, response: &ProviderResponse) -> Result<Value, CoreError> {
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();
    let error = parsed
        .as_ref()
        .filter(|v| v.is_object())
        .and_then(|v| ErrorBody::deserialize(v).ok());

    let code = error.as_ref().and_then(|e| e.code);
    let message = error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("HTTP {}", response.status));

    if response.status == 429 || code == Some(RATE_LIMITED_CODE) {
        return Err(CoreError::ProviderRateLimited {
            provider: provider.to_string(),
            message,
        });
    }

    let error_status = error
        .as_ref()
        .and_then(|e| e.status.as_deref())
        .is_some_and(|s| s.eq_ignore_ascii_case("error"));

    if !response.is_success() || code.is_some() || error_status {
        let message = match code {
            Some(code) => format!("code {code}: {message}"),
            None => message,
        };
        return Err(CoreError::Provider {
            provider: provider.to_string(),
            message,
        });
    }

    parsed.ok_or_else(|| malformed(provider, "response body is not valid JSON"))
}

/// Extract the rates of `requested` from an `/exchange_rate` response.
///
/// One requested symbol → the payload is a single `{symbol, rate}` object that
/// must name that symbol. Several → an object keyed by symbol; absent keys and
/// unusable rates land in `missing`.
pub fn parse_exchange_rates(
    provider: &str,
    response: &ProviderResponse,
    requested: &[CurrencyPair],
) -> Result<ParsedRates, CoreError> {
    let body = classify(provider, response)?;
    let mut parsed = ParsedRates::default();

    match requested {
        [] => {}
        [pair] => {
            let quote = RateQuote::deserialize(&body).map_err(|e| {
                malformed(provider, format!("expected a single rate object for {pair}: {e}"))
            })?;
            if normalize_code(&quote.symbol) != pair.symbol() {
                return Err(malformed(
                    provider,
                    format!("requested {pair} but received {}", quote.symbol),
                ));
            }
            match quote.rate.value() {
                Some(rate) => parsed.found.push((pair.clone(), rate)),
                None => parsed.missing.push(pair.clone()),
            }
        }
        pairs => {
            let map = body.as_object().ok_or_else(|| {
                malformed(provider, "expected an object keyed by symbol")
            })?;
            if map.contains_key("symbol") && map.contains_key("rate") {
                return Err(malformed(
                    provider,
                    format!("requested {} symbols but received a single rate object", pairs.len()),
                ));
            }
            for pair in pairs {
                let rate = map
                    .get(&pair.symbol())
                    .and_then(|entry| RateQuote::deserialize(entry).ok())
                    .and_then(|quote| quote.rate.value());
                match rate {
                    Some(rate) => parsed.found.push((pair.clone(), rate)),
                    None => parsed.missing.push(pair.clone()),
                }
            }
        }
    }

    Ok(parsed)
}

/// Map a reference list onto currencies. The first occurrence of a code wins.
pub fn parse_reference(
    provider: &str,
    kind: ReferenceKind,
    response: &ProviderResponse,
) -> Result<Vec<Currency>, CoreError> {
    let body = classify(provider, response)?;
    let list = ReferenceList::deserialize(&body)
        .map_err(|e| malformed(provider, format!("unexpected {kind} payload: {e}")))?;

    let mut seen = HashSet::new();
    let mut currencies = Vec::new();
    let mut push = |code: &str, name: Option<&str>, currency_kind: CurrencyKind| {
        let code = normalize_code(code);
        if code.is_empty() || !seen.insert(code.clone()) {
            return;
        }
        currencies.push(Currency::new(code.clone(), name.unwrap_or(code.as_str()), currency_kind));
    };

    for record in &list.data {
        let (first, second) = match record.symbol.split_once('/') {
            Some((a, b)) => (a, Some(b)),
            None => (record.symbol.as_str(), None),
        };
        match kind {
            ReferenceKind::ForexPairs => {
                push(first, record.currency_base.as_deref(), CurrencyKind::Currency);
                if let Some(second) = second {
                    push(second, record.currency_quote.as_deref(), CurrencyKind::Currency);
                }
            }
            ReferenceKind::Cryptocurrencies => {
                push(first, record.currency_base.as_deref(), CurrencyKind::Cryptocurrency);
            }
            ReferenceKind::Commodities => {
                push(first, record.name.as_deref(), CurrencyKind::Commodity);
            }
        }
    }

    Ok(currencies)
}

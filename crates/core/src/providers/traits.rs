use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::currency::CurrencyKind;

/// Raw answer of the pricing provider: HTTP status plus the unparsed body.
///
/// Classification (rate limit, embedded error codes, shape) happens in
/// `providers::response`, so every provider implementation stays a thin
/// transport and tests can feed canned payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

impl ProviderResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A 200 response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Reference list exposed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    ForexPairs,
    Cryptocurrencies,
    Commodities,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 3] = [
        ReferenceKind::ForexPairs,
        ReferenceKind::Cryptocurrencies,
        ReferenceKind::Commodities,
    ];

    /// Path segment of the reference endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ReferenceKind::ForexPairs => "forex_pairs",
            ReferenceKind::Cryptocurrencies => "cryptocurrencies",
            ReferenceKind::Commodities => "commodities",
        }
    }

    /// Kind of the currencies derived from this list.
    pub fn currency_kind(&self) -> CurrencyKind {
        match self {
            ReferenceKind::ForexPairs => CurrencyKind::Currency,
            ReferenceKind::Cryptocurrencies => CurrencyKind::Cryptocurrency,
            ReferenceKind::Commodities => CurrencyKind::Commodity,
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

/// Transport to an exchange-rate provider.
///
/// Implementations only perform the request. Transport failures come back as
/// `Err(CoreError::Network)`; any HTTP answer, including 4xx/5xx, comes back
/// as `Ok(ProviderResponse)`.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RateProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors and usage counting).
    fn name(&self) -> &str;

    /// One batched exchange-rate request for `symbols` ("QUOTE/BASE") on `date`.
    async fn fetch_exchange_rates(
        &self,
        symbols: &[String],
        date: NaiveDate,
    ) -> Result<ProviderResponse, CoreError>;

    /// Fetch one of the provider's reference lists.
    async fn fetch_reference(&self, kind: ReferenceKind) -> Result<ProviderResponse, CoreError>;
}

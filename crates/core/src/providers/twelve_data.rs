use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use reqwest::Client;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::settings::ProviderSettings;

use super::traits::{ProviderResponse, RateProvider, ReferenceKind};

pub const PROVIDER_NAME: &str = "Twelve Data";

/// Twelve Data API provider for forex, crypto and commodity exchange rates.
///
/// - **Requires**: API key (set via settings as "twelve_data").
/// - **Endpoints**: `/exchange_rate`, `/forex_pairs`, `/cryptocurrencies`, `/commodities`
/// - **Batching**: several comma-separated symbols per `/exchange_rate` call.
///
/// The API key travels in the query string, so URLs are never logged.
pub struct TwelveDataProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TwelveDataProvider {
    pub fn new(api_key: String, settings: &ProviderSettings) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(settings.timeout_secs));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<ProviderResponse, CoreError> {
        let url = format!("{}/{endpoint}", self.base_url);

        debug!("{PROVIDER_NAME} request: /{endpoint} with {} params", params.len());

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!("{PROVIDER_NAME} /{endpoint} answered HTTP {status} ({} bytes)", body.len());
        Ok(ProviderResponse::new(status, body))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RateProvider for TwelveDataProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_exchange_rates(
        &self,
        symbols: &[String],
        date: NaiveDate,
    ) -> Result<ProviderResponse, CoreError> {
        let params = [
            ("symbol", symbols.join(",")),
            ("date", date.format("%Y-%m-%d").to_string()),
        ];
        self.get("exchange_rate", &params).await
    }

    async fn fetch_reference(&self, kind: ReferenceKind) -> Result<ProviderResponse, CoreError> {
        self.get(kind.endpoint(), &[]).await
    }
}

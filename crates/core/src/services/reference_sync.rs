use chrono::Utc;
use log::info;
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::currency::Currency;
use crate::providers::response::parse_reference;
use crate::providers::traits::{RateProvider, ReferenceKind};
use crate::storage::traits::{ApiUsageRepository, CurrencyRepository};

/// Seeds the currency universe from the provider's reference lists.
pub struct ReferenceSyncService {
    provider: Arc<dyn RateProvider>,
    currencies: Arc<dyn CurrencyRepository>,
    usage: Arc<dyn ApiUsageRepository>,
}

impl ReferenceSyncService {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        currencies: Arc<dyn CurrencyRepository>,
        usage: Arc<dyn ApiUsageRepository>,
    ) -> Self {
        Self {
            provider,
            currencies,
            usage,
        }
    }

    /// Fetch the given lists, merge them (first occurrence of a code wins,
    /// in the order of `kinds`) and upsert the result in one batch.
    ///
    /// Returns the number of currencies upserted. Any provider error fails the
    /// whole sync before anything is written.
    pub async fn sync(&self, kinds: &[ReferenceKind]) -> Result<usize, CoreError> {
        let provider = self.provider.name().to_string();
        let mut seen = HashSet::new();
        let mut merged: Vec<Currency> = Vec::new();

        for &kind in kinds {
            self.usage.record_call(&provider, Utc::now().date_naive())?;
            let response = self.provider.fetch_reference(kind).await?;
            let currencies = parse_reference(&provider, kind, &response)?;
            info!("{provider} {kind}: {} currencies", currencies.len());

            merged.extend(currencies.into_iter().filter(|c| seen.insert(c.code.clone())));
        }

        if merged.is_empty() {
            return Ok(0);
        }
        self.currencies.upsert_currencies(&merged)
    }
}

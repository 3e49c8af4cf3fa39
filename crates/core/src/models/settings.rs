use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::errors::CoreError;
use crate::models::currency::normalize_code;

/// Key under which the Twelve Data API key is stored in `api_keys`.
pub const TWELVE_DATA_KEY: &str = "twelve_data";

/// Library configuration. Deserialized from JSON; every section has defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The currency all totals are normalized into (e.g., "IDR", "USD").
    pub base_currency: String,

    /// API keys by provider name (e.g., "twelve_data").
    pub api_keys: HashMap<String, String>,

    pub provider: ProviderSettings,

    pub jobs: JobSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_currency: "USD".to_string(),
            api_keys: HashMap::new(),
            provider: ProviderSettings::default(),
            jobs: JobSettings::default(),
        }
    }
}

/// Pricing provider connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Quote currencies the provider prices in the opposite direction
    /// (base per quote). Their raw rates are inverted before storage.
    pub inverted_currencies: BTreeSet<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.twelvedata.com".to_string(),
            timeout_secs: 30,
            inverted_currencies: BTreeSet::new(),
        }
    }
}

/// Job queue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Retries allowed before a job is marked failed.
    pub max_retries: u32,
    /// Provider calls allowed per UTC day. `None` disables the check.
    pub daily_call_limit: Option<u32>,
    /// Upper bound on dates drained by one queue run.
    pub max_dates_per_run: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            daily_call_limit: Some(800),
            max_dates_per_run: 30,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document and validate them.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let mut settings: Settings = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("Failed to parse settings: {e}")))?;
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file on disk (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn api_key(&self, provider: &str) -> Option<&str> {
        self.api_keys.get(provider).map(String::as_str)
    }

    /// Uppercase all currency codes so lookups are case-insensitive.
    fn normalize(&mut self) {
        self.base_currency = normalize_code(&self.base_currency);
        self.provider.inverted_currencies = self
            .provider
            .inverted_currencies
            .iter()
            .map(|c| normalize_code(c))
            .collect();
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let base = &self.base_currency;
        if base.is_empty() || !base.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::Config(format!(
                "Invalid base currency '{base}': must be a non-empty alphanumeric code (e.g., IDR, USD)"
            )));
        }
        if self.provider.timeout_secs == 0 {
            return Err(CoreError::Config("provider.timeout_secs must be positive".into()));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(CoreError::Config("provider.base_url must not be empty".into()));
        }
        if self.jobs.max_dates_per_run == 0 {
            return Err(CoreError::Config("jobs.max_dates_per_run must be positive".into()));
        }
        Ok(())
    }
}

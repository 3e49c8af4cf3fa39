use thiserror::Error;

/// Unified error type for the entire wealth-ledger-core library.
/// Every public function returns `Result<T, CoreError>`.
///
/// A missing exchange rate is deliberately NOT an error: it flows through
/// summaries as an explicit unknown value (see `models::summary::BaseAmount`).
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Persistence ─────────────────────────────────────────────────
    #[error("Persistence error: {0}")]
    Persistence(String),

    // ── Snapshot / File ─────────────────────────────────────────────
    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── Provider / Network ──────────────────────────────────────────
    #[error("Rate limited by {provider}: {message}")]
    ProviderRateLimited { provider: String, message: String },

    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Malformed response from {provider}: {message}")]
    MalformedProviderResponse { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    // ── Business Logic / Config ─────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    /// True for every failure that originates at the pricing provider
    /// (including transport errors). The fetch worker turns these into
    /// an aborted run instead of propagating them.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            CoreError::ProviderRateLimited { .. }
                | CoreError::Provider { .. }
                | CoreError::MalformedProviderResponse { .. }
                | CoreError::Network(_)
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors embed the full URL, and the Twelve Data key travels
        // in the query string. The cause chain carries the useful part.
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        CoreError::Network(redact_api_key(&message))
    }
}

const API_KEY_PARAM: &str = "apikey=";

/// Replace every `apikey=` query value with `<redacted>`, keeping the rest of
/// the message (URL path, other parameters, error cause) intact.
pub fn redact_api_key(msg: &str) -> String {
    let mut out = String::with_capacity(msg.len());
    let mut rest = msg;
    while let Some(idx) = rest.find(API_KEY_PARAM) {
        let value_start = idx + API_KEY_PARAM.len();
        out.push_str(&rest[..value_start]);
        out.push_str("<redacted>");
        let value = &rest[value_start..];
        let value_len = value
            .find(|c: char| c == '&' || c == ')' || c == '#' || c.is_whitespace())
            .unwrap_or(value.len());
        rest = &value[value_len..];
    }
    out.push_str(rest);
    out
}

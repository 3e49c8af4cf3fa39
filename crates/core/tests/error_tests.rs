// ═══════════════════════════════════════════════════════════════════
// Error Tests — CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use wealth_ledger_core::errors::{redact_api_key, CoreError};

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn persistence() {
        let err = CoreError::Persistence("table 'jobs' is poisoned".into());
        assert_eq!(err.to_string(), "Persistence error: table 'jobs' is poisoned");
    }

    #[test]
    fn invalid_file_format() {
        let err = CoreError::InvalidFileFormat("bad header".into());
        assert_eq!(err.to_string(), "Invalid file format: bad header");
    }

    #[test]
    fn unsupported_version() {
        let err = CoreError::UnsupportedVersion(99);
        assert_eq!(err.to_string(), "Unsupported file version: 99");
    }

    #[test]
    fn serialization() {
        let err = CoreError::Serialization("oops".into());
        assert_eq!(err.to_string(), "Serialization error: oops");
    }

    #[test]
    fn deserialization() {
        let err = CoreError::Deserialization("eof".into());
        assert_eq!(err.to_string(), "Deserialization error: eof");
    }

    #[test]
    fn file_io() {
        let err = CoreError::FileIO("not found".into());
        assert_eq!(err.to_string(), "File I/O error: not found");
    }

    #[test]
    fn provider_rate_limited() {
        let err = CoreError::ProviderRateLimited {
            provider: "Twelve Data".into(),
            message: "out of API credits".into(),
        };
        assert_eq!(err.to_string(), "Rate limited by Twelve Data: out of API credits");
    }

    #[test]
    fn provider() {
        let err = CoreError::Provider {
            provider: "Twelve Data".into(),
            message: "code 400: symbol parameter is missing".into(),
        };
        assert_eq!(
            err.to_string(),
            "Provider error (Twelve Data): code 400: symbol parameter is missing"
        );
    }

    #[test]
    fn malformed_provider_response() {
        let err = CoreError::MalformedProviderResponse {
            provider: "Twelve Data".into(),
            message: "expected an object keyed by symbol".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed response from Twelve Data: expected an object keyed by symbol"
        );
    }

    #[test]
    fn network() {
        let err = CoreError::Network("timeout".into());
        assert_eq!(err.to_string(), "Network error: timeout");
    }

    #[test]
    fn validation() {
        let err = CoreError::Validation("empty side".into());
        assert_eq!(err.to_string(), "Validation failed: empty side");
    }

    #[test]
    fn config() {
        let err = CoreError::Config("missing key".into());
        assert_eq!(err.to_string(), "Invalid configuration: missing key");
    }
}

// ── Provider failure classification ─────────────────────────────────

mod provider_failure {
    use super::*;

    #[test]
    fn provider_side_variants() {
        let errors = [
            CoreError::ProviderRateLimited {
                provider: "p".into(),
                message: "m".into(),
            },
            CoreError::Provider {
                provider: "p".into(),
                message: "m".into(),
            },
            CoreError::MalformedProviderResponse {
                provider: "p".into(),
                message: "m".into(),
            },
            CoreError::Network("reset".into()),
        ];
        for err in &errors {
            assert!(err.is_provider_failure(), "{err:?}");
        }
    }

    #[test]
    fn local_variants() {
        let errors = [
            CoreError::Persistence("x".into()),
            CoreError::Validation("x".into()),
            CoreError::Config("x".into()),
            CoreError::FileIO("x".into()),
            CoreError::UnsupportedVersion(2),
        ];
        for err in &errors {
            assert!(!err.is_provider_failure(), "{err:?}");
        }
    }
}

// ── From impls ──────────────────────────────────────────────────────

mod from_impls {
    use super::*;

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        match &core_err {
            CoreError::FileIO(msg) => assert!(msg.contains("file not found")),
            other => panic!("Expected FileIO, got {:?}", other),
        }
    }

    #[test]
    fn from_bincode_error() {
        let bad_data: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<String, _> = bincode::deserialize(bad_data);
        let core_err: CoreError = result.unwrap_err().into();
        match &core_err {
            CoreError::Serialization(msg) => assert!(!msg.is_empty()),
            other => panic!("Expected Serialization, got {:?}", other),
        }
    }

    #[test]
    fn from_serde_json_error() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("");
        let core_err: CoreError = result.unwrap_err().into();
        match &core_err {
            CoreError::Deserialization(msg) => assert!(msg.contains("EOF")),
            other => panic!("Expected Deserialization, got {:?}", other),
        }
    }
}

// ── API key redaction ───────────────────────────────────────────────

mod redaction {
    use super::*;

    #[test]
    fn key_is_hidden_and_cause_kept() {
        let msg = "error sending request for url (https://api.twelvedata.com/exchange_rate?symbol=USD/IDR&apikey=s3cr3t): connection refused";
        let redacted = redact_api_key(msg);

        assert!(!redacted.contains("s3cr3t"));
        assert_eq!(
            redacted,
            "error sending request for url (https://api.twelvedata.com/exchange_rate?symbol=USD/IDR&apikey=<redacted>): connection refused"
        );
    }

    #[test]
    fn key_at_end_of_message() {
        assert_eq!(
            redact_api_key("GET /forex_pairs?apikey=abc"),
            "GET /forex_pairs?apikey=<redacted>"
        );
    }

    #[test]
    fn key_followed_by_other_params() {
        assert_eq!(
            redact_api_key("?apikey=abc&date=2025-01-15 timed out"),
            "?apikey=<redacted>&date=2025-01-15 timed out"
        );
    }

    #[test]
    fn every_occurrence_is_hidden() {
        let redacted = redact_api_key("a?apikey=one b?apikey=two");
        assert_eq!(redacted, "a?apikey=<redacted> b?apikey=<redacted>");
    }

    #[test]
    fn message_without_key_is_unchanged() {
        assert_eq!(redact_api_key("dns error: no such host"), "dns error: no such host");
    }
}

// ── std::error::Error ───────────────────────────────────────────────

mod std_error {
    use super::*;

    #[test]
    fn core_error_implements_error_trait() {
        let err: Box<dyn std::error::Error> = Box::new(CoreError::Network("x".into()));
        assert_eq!(err.to_string(), "Network error: x");
    }

    #[test]
    fn core_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CoreError>();
    }
}

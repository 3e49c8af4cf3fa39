// ═══════════════════════════════════════════════════════════════════
// Provider Tests — response classification, rate payload shapes,
// reference mapping, direction normalization, Twelve Data setup
// ═══════════════════════════════════════════════════════════════════

use wealth_ledger_core::errors::CoreError;
use wealth_ledger_core::models::currency::{CurrencyKind, CurrencyPair};
use wealth_ledger_core::models::settings::ProviderSettings;
use wealth_ledger_core::providers::normalize::{RateDirection, RateNormalizer};
use wealth_ledger_core::providers::response::{classify, parse_exchange_rates, parse_reference};
use wealth_ledger_core::providers::traits::{ProviderResponse, RateProvider, ReferenceKind};
use wealth_ledger_core::providers::twelve_data::{TwelveDataProvider, PROVIDER_NAME};

const PROVIDER: &str = "Twelve Data";

fn pair(quote: &str, base: &str) -> CurrencyPair {
    CurrencyPair::new(quote, base).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// Error classification
// ═══════════════════════════════════════════════════════════════════

mod classification {
    use super::*;

    #[test]
    fn success_returns_body() {
        let value = classify(PROVIDER, &ProviderResponse::ok(r#"{"symbol":"USD/IDR"}"#)).unwrap();
        assert_eq!(value["symbol"], "USD/IDR");
    }

    #[test]
    fn embedded_429_is_rate_limited() {
        let response = ProviderResponse::ok(
            r#"{"code":429,"message":"You have run out of API credits for the current minute.","status":"error"}"#,
        );
        match classify(PROVIDER, &response) {
            Err(CoreError::ProviderRateLimited { provider, message }) => {
                assert_eq!(provider, PROVIDER);
                assert!(message.contains("API credits"));
            }
            other => panic!("Expected ProviderRateLimited, got {other:?}"),
        }
    }

    #[test]
    fn http_429_without_json_is_rate_limited() {
        let response = ProviderResponse::new(429, "<html>slow down</html>");
        assert!(matches!(
            classify(PROVIDER, &response),
            Err(CoreError::ProviderRateLimited { .. })
        ));
    }

    #[test]
    fn other_code_is_provider_error() {
        let response = ProviderResponse::ok(
            r#"{"code":400,"message":"symbol parameter is missing or invalid","status":"error"}"#,
        );
        match classify(PROVIDER, &response) {
            Err(CoreError::Provider { message, .. }) => {
                assert!(message.contains("400"));
                assert!(message.contains("symbol parameter"));
            }
            other => panic!("Expected Provider, got {other:?}"),
        }
    }

    #[test]
    fn status_error_without_code_is_provider_error() {
        let response = ProviderResponse::ok(r#"{"status":"error","message":"boom"}"#);
        assert!(matches!(classify(PROVIDER, &response), Err(CoreError::Provider { .. })));
    }

    #[test]
    fn http_500_is_provider_error() {
        let response = ProviderResponse::new(500, "Internal Server Error");
        match classify(PROVIDER, &response) {
            Err(CoreError::Provider { message, .. }) => assert!(message.contains("500")),
            other => panic!("Expected Provider, got {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        let response = ProviderResponse::ok("not json");
        assert!(matches!(
            classify(PROVIDER, &response),
            Err(CoreError::MalformedProviderResponse { .. })
        ));
    }

    #[test]
    fn provider_failures_are_flagged() {
        let err = classify(PROVIDER, &ProviderResponse::new(503, "")).unwrap_err();
        assert!(err.is_provider_failure());
    }
}

// ═══════════════════════════════════════════════════════════════════
// /exchange_rate payloads
// ═══════════════════════════════════════════════════════════════════

mod exchange_rate_shapes {
    use super::*;

    #[test]
    fn single_object() {
        let response = ProviderResponse::ok(r#"{"symbol":"USD/IDR","rate":15800,"timestamp":1705276800}"#);
        let parsed = parse_exchange_rates(PROVIDER, &response, &[pair("USD", "IDR")]).unwrap();

        assert_eq!(parsed.found, vec![(pair("USD", "IDR"), 15800.0)]);
        assert!(parsed.missing.is_empty());
    }

    #[test]
    fn single_object_symbol_case_is_ignored() {
        let response = ProviderResponse::ok(r#"{"symbol":"usd/idr","rate":15800}"#);
        let parsed = parse_exchange_rates(PROVIDER, &response, &[pair("USD", "IDR")]).unwrap();
        assert_eq!(parsed.found.len(), 1);
    }

    #[test]
    fn single_object_with_wrong_symbol_is_malformed() {
        let response = ProviderResponse::ok(r#"{"symbol":"EUR/IDR","rate":17000}"#);
        let result = parse_exchange_rates(PROVIDER, &response, &[pair("USD", "IDR")]);
        assert!(matches!(result, Err(CoreError::MalformedProviderResponse { .. })));
    }

    #[test]
    fn single_object_without_rate_is_malformed() {
        let response = ProviderResponse::ok(r#"{"symbol":"USD/IDR"}"#);
        let result = parse_exchange_rates(PROVIDER, &response, &[pair("USD", "IDR")]);
        assert!(matches!(result, Err(CoreError::MalformedProviderResponse { .. })));
    }

    #[test]
    fn map_keyed_by_symbol() {
        let response = ProviderResponse::ok(
            r#"{
                "USD/IDR": {"symbol":"USD/IDR","rate":15800,"timestamp":1705276800},
                "EUR/IDR": {"symbol":"EUR/IDR","rate":"17250.25","timestamp":1705276800}
            }"#,
        );
        let parsed = parse_exchange_rates(
            PROVIDER,
            &response,
            &[pair("USD", "IDR"), pair("EUR", "IDR")],
        )
        .unwrap();

        assert_eq!(
            parsed.found,
            vec![(pair("USD", "IDR"), 15800.0), (pair("EUR", "IDR"), 17250.25)]
        );
    }

    #[test]
    fn map_with_absent_and_broken_entries() {
        let response = ProviderResponse::ok(
            r#"{
                "USD/IDR": {"symbol":"USD/IDR","rate":15800},
                "SGD/IDR": {"code":400,"message":"not found","status":"error"},
                "JPY/IDR": {"symbol":"JPY/IDR","rate":-1}
            }"#,
        );
        let parsed = parse_exchange_rates(
            PROVIDER,
            &response,
            &[pair("USD", "IDR"), pair("EUR", "IDR"), pair("SGD", "IDR"), pair("JPY", "IDR")],
        )
        .unwrap();

        assert_eq!(parsed.found, vec![(pair("USD", "IDR"), 15800.0)]);
        assert_eq!(
            parsed.missing,
            vec![pair("EUR", "IDR"), pair("SGD", "IDR"), pair("JPY", "IDR")]
        );
    }

    #[test]
    fn single_object_for_many_symbols_is_malformed() {
        let response = ProviderResponse::ok(r#"{"symbol":"USD/IDR","rate":15800}"#);
        let result = parse_exchange_rates(
            PROVIDER,
            &response,
            &[pair("USD", "IDR"), pair("EUR", "IDR")],
        );
        assert!(matches!(result, Err(CoreError::MalformedProviderResponse { .. })));
    }

    #[test]
    fn array_is_malformed() {
        let response = ProviderResponse::ok("[]");
        let result = parse_exchange_rates(
            PROVIDER,
            &response,
            &[pair("USD", "IDR"), pair("EUR", "IDR")],
        );
        assert!(matches!(result, Err(CoreError::MalformedProviderResponse { .. })));
    }

    #[test]
    fn unparseable_string_rate_is_missing() {
        let response = ProviderResponse::ok(r#"{"symbol":"USD/IDR","rate":"n/a"}"#);
        let parsed = parse_exchange_rates(PROVIDER, &response, &[pair("USD", "IDR")]).unwrap();
        assert!(parsed.found.is_empty());
        assert_eq!(parsed.missing, vec![pair("USD", "IDR")]);
    }

    #[test]
    fn error_code_wins_over_shape() {
        let response = ProviderResponse::ok(r#"{"code":429,"message":"limit","status":"error"}"#);
        let result = parse_exchange_rates(PROVIDER, &response, &[pair("USD", "IDR")]);
        assert!(matches!(result, Err(CoreError::ProviderRateLimited { .. })));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Reference lists
// ═══════════════════════════════════════════════════════════════════

mod reference_lists {
    use super::*;

    #[test]
    fn forex_yields_both_sides() {
        let response = ProviderResponse::ok(
            r#"{"data":[{"symbol":"EUR/USD","currency_group":"Major","currency_base":"Euro","currency_quote":"US Dollar"}],"status":"ok"}"#,
        );
        let currencies = parse_reference(PROVIDER, ReferenceKind::ForexPairs, &response).unwrap();

        let codes: Vec<&str> = currencies.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["EUR", "USD"]);
        assert_eq!(currencies[0].name, "Euro");
        assert_eq!(currencies[1].name, "US Dollar");
        assert!(currencies.iter().all(|c| c.kind == CurrencyKind::Currency));
    }

    #[test]
    fn crypto_yields_base_only() {
        let response = ProviderResponse::ok(
            r#"{"data":[{"symbol":"ETH/BTC","currency_base":"Ethereum","currency_quote":"Bitcoin"}]}"#,
        );
        let currencies =
            parse_reference(PROVIDER, ReferenceKind::Cryptocurrencies, &response).unwrap();

        assert_eq!(currencies.len(), 1);
        assert_eq!(currencies[0].code, "ETH");
        assert_eq!(currencies[0].kind, CurrencyKind::Cryptocurrency);
    }

    #[test]
    fn commodity_with_and_without_slash() {
        let response = ProviderResponse::ok(
            r#"{"data":[{"symbol":"XAG/USD","name":"Silver Spot"},{"symbol":"C_1","name":"Corn"}]}"#,
        );
        let currencies = parse_reference(PROVIDER, ReferenceKind::Commodities, &response).unwrap();

        let codes: Vec<&str> = currencies.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["XAG", "C_1"]);
        assert_eq!(currencies[1].name, "Corn");
        assert_eq!(currencies[1].kind, CurrencyKind::Commodity);
    }

    #[test]
    fn first_occurrence_wins() {
        let response = ProviderResponse::ok(
            r#"{"data":[
                {"symbol":"USD/JPY","currency_base":"US Dollar","currency_quote":"Japanese Yen"},
                {"symbol":"USD/IDR","currency_base":"United States Dollar","currency_quote":"Rupiah"}
            ]}"#,
        );
        let currencies = parse_reference(PROVIDER, ReferenceKind::ForexPairs, &response).unwrap();

        assert_eq!(currencies.len(), 3);
        let usd = currencies.iter().find(|c| c.code == "USD").unwrap();
        assert_eq!(usd.name, "US Dollar");
    }

    #[test]
    fn missing_name_falls_back_to_code() {
        let response = ProviderResponse::ok(r#"{"data":[{"symbol":"XPT/USD"}]}"#);
        let currencies = parse_reference(PROVIDER, ReferenceKind::Commodities, &response).unwrap();
        assert_eq!(currencies[0].name, "XPT");
    }

    #[test]
    fn missing_data_is_malformed() {
        let response = ProviderResponse::ok(r#"{"status":"ok"}"#);
        let result = parse_reference(PROVIDER, ReferenceKind::ForexPairs, &response);
        assert!(matches!(result, Err(CoreError::MalformedProviderResponse { .. })));
    }

    #[test]
    fn endpoints() {
        assert_eq!(ReferenceKind::ForexPairs.endpoint(), "forex_pairs");
        assert_eq!(ReferenceKind::Cryptocurrencies.endpoint(), "cryptocurrencies");
        assert_eq!(ReferenceKind::Commodities.endpoint(), "commodities");
        assert_eq!(ReferenceKind::Commodities.currency_kind(), CurrencyKind::Commodity);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Direction normalization
// ═══════════════════════════════════════════════════════════════════

mod normalization {
    use super::*;

    #[test]
    fn default_passes_through() {
        let normalizer = RateNormalizer::default();
        assert_eq!(normalizer.normalize("USD", 15800.0), 15800.0);
        assert_eq!(normalizer.direction("USD"), RateDirection::Direct);
    }

    #[test]
    fn inverted_currency_is_inverted() {
        let normalizer = RateNormalizer::new(["idr"]);
        assert_eq!(normalizer.direction("IDR"), RateDirection::Inverted);
        assert_eq!(normalizer.normalize("IDR", 16000.0), 1.0 / 16000.0);
        assert_eq!(normalizer.normalize("USD", 16000.0), 16000.0);
    }

    #[test]
    fn applying_twice_undoes_inversion() {
        let normalizer = RateNormalizer::new(["IDR"]);
        let once = normalizer.normalize("IDR", 4.0);
        assert_eq!(once, 0.25);
        assert_eq!(normalizer.normalize("IDR", once), 4.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Twelve Data provider
// ═══════════════════════════════════════════════════════════════════

mod twelve_data {
    use super::*;

    #[test]
    fn name_and_construction() {
        let provider = TwelveDataProvider::new("demo".into(), &ProviderSettings::default());
        assert_eq!(provider.name(), PROVIDER_NAME);
    }

    #[test]
    fn response_helpers() {
        assert!(ProviderResponse::ok("{}").is_success());
        assert!(!ProviderResponse::new(429, "").is_success());
    }
}

/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
mod common;

use proptest::prelude::*;
use rust_fianca_api::aggregator::{settle, DEFAULT_DECLINE_MESSAGE};
use rust_fianca_api::errors::AdapterError;
use rust_fianca_api::insurers::{PORTO_SEGURO, TOKIO_MARINE};
use rust_fianca_api::models::{main_status, status, QuoteResult};
use rust_fianca_api::pottencial_client::derived_premium;
use rust_fianca_api::token_cache::AccessToken;
use rust_fianca_api::validation::{is_valid_document, validate_br_phone, validate_quote_request};

// Property: the derived premium is rent * 0.084 with exactly two decimals
proptest! {
    #[test]
    fn derived_premium_has_two_decimals(cents in 0u64..100_000_000u64) {
        let rent = cents as f64 / 100.0;
        let premium = derived_premium(rent);

        let (_, decimals) = premium.split_once('.').expect("premium has a decimal point");
        prop_assert_eq!(decimals.len(), 2);

        // Integer arithmetic in ten-thousandths of a cent: 0.084 = 84/1000
        let scaled = cents as u128 * 84;
        let expected_cents = (scaled + 500) / 1000;
        prop_assert_eq!(
            premium,
            format!("{}.{:02}", expected_cents / 100, expected_cents % 100)
        );
    }

    #[test]
    fn derived_premium_is_monotonic(a in 0u32..1_000_000u32, b in 0u32..1_000_000u32) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low: f64 = derived_premium(low as f64).parse().unwrap();
        let high: f64 = derived_premium(high as f64).parse().unwrap();
        prop_assert!(low <= high);
    }
}

// Property: a failed insurer always yields a well-formed decline
proptest! {
    #[test]
    fn failure_becomes_decline(message in "\\PC{0,40}", tokio in proptest::bool::ANY) {
        let profile = if tokio { &TOKIO_MARINE } else { &PORTO_SEGURO };
        let result = settle(profile, Err(AdapterError::new(message.clone())));

        prop_assert_eq!(result.insurer_name.as_str(), profile.name);
        prop_assert_eq!(result.insurer_logo.as_str(), profile.logo);
        prop_assert_eq!(result.status.as_str(), status::RECUSADO);
        prop_assert!(result.quote_id.is_none());
        prop_assert!(result.total_premium.is_none());
        if message.trim().is_empty() {
            prop_assert_eq!(result.message.as_str(), DEFAULT_DECLINE_MESSAGE);
        } else {
            prop_assert_eq!(result.message, message);
        }
    }

    #[test]
    fn main_status_is_one_of_the_results(statuses in proptest::collection::vec(("[A-Za-z ]{1,12}", proptest::bool::ANY), 0..5)) {
        let quotes: Vec<QuoteResult> = statuses
            .iter()
            .map(|(s, quoted)| QuoteResult {
                insurer_name: "X".to_string(),
                insurer_logo: String::new(),
                quote_id: quoted.then(|| "Q".to_string()),
                status: s.clone(),
                total_premium: None,
                message: String::new(),
            })
            .collect();

        let headline = main_status(&quotes);
        if quotes.is_empty() {
            prop_assert_eq!(headline.as_str(), status::PENDENTE);
        } else {
            prop_assert!(quotes.iter().any(|q| q.status == headline));
        }
    }
}

// Property: tokens are refreshed strictly inside the 60 second margin
proptest! {
    #[test]
    fn freshness_follows_refresh_margin(now in 0i64..4_000_000_000i64, remaining in -3600i64..7200i64) {
        let token = AccessToken::new("t", now + remaining);
        prop_assert_eq!(token.is_fresh_at(now), remaining > 60);
    }
}

// Property: validation never panics
proptest! {
    #[test]
    fn phone_validation_never_panics(phone in "\\PC*") {
        let _ = validate_br_phone(&phone);
    }

    #[test]
    fn document_validation_counts_digits(digits in "[0-9]{1,20}", punctuation in "[./-]{0,4}") {
        let document = format!("{}{}", digits, punctuation);
        prop_assert_eq!(is_valid_document(&document), digits.len() == 11 || digits.len() == 14);
    }

    #[test]
    fn quote_validation_never_panics(email in "\\PC{0,30}", phone in "\\PC{0,20}", rent in -1.0e6f64..1.0e6f64) {
        let mut request = common::quote_request(1000.0);
        request.participants[0].contact.email = email;
        request.participants[0].contact.cell_phone_number = phone;
        request.risk_objects[0].expenses[0].value = rent;

        let result = validate_quote_request(&request);
        if rent < 0.0 {
            prop_assert!(result.is_err());
        }
    }
}

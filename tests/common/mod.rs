//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use rust_fianca_api::config::{Config, PottencialConfig, TokenStoreKind};
use rust_fianca_api::models::QuoteRequest;
use serde_json::{json, Value};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const SESSION_SECRET: &str = "integration-session-secret-0123456789";

/// Config pointing the Pottencial integration at a mock server.
pub fn test_config(server_uri: &str, token_store: TokenStoreKind) -> Config {
    Config {
        port: 0,
        app_env: "development".to_string(),
        database_url: None,
        pottencial: PottencialConfig {
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
            token_url: format!("{}/oauth/token", server_uri),
            quote_url: format!("{}/quotes", server_uri),
        },
        insurer_timeout_secs: 5,
        token_store,
        session_secret: SESSION_SECRET.to_string(),
    }
}

/// Quote request body as the browser sends it.
pub fn quote_request_json(rent: f64) -> Value {
    let address = json!({
        "street": "Av. Paulista",
        "number": "1000",
        "district": "Bela Vista",
        "city": "São Paulo",
        "state": "SP",
        "zipCode": "01310100",
        "country": "BRA",
        "type": "Residential"
    });
    let participant = |role: &str| {
        json!({
            "documentNumber": "52998224725",
            "role": role,
            "address": address,
            "contact": {
                "name": "João Pereira",
                "email": "joao.pereira@example.com",
                "phoneNumber": "",
                "cellPhoneNumber": "11987654321"
            }
        })
    };

    json!({
        "policyPeriodStart": "2026-11-01",
        "policyPeriodEnd": "2027-10-31",
        "policyType": "Unique",
        "commissionedAgents": [
            { "documentNumber": "11222333000181", "role": "Broker", "commissionPercentage": 10.0, "lead": true, "isPayer": false },
            { "documentNumber": "11444777000161", "role": "PolicyOwner", "lead": false, "isPayer": false }
        ],
        "participants": [
            participant("Beneficiary"),
            participant("PolicyHolder"),
            participant("Insured")
        ],
        "riskObjects": [{
            "type": "rentalProperty",
            "tenantDocumentNumber": "52998224725",
            "startLeaseContract": "2026-11-01",
            "endLeaseContract": "2029-10-31",
            "coverages": [{ "key": "basica", "insuredAmount": rent * 30.0 }],
            "riskLocation": { "nationalCoverage": false, "address": address },
            "expenses": [
                { "description": "VALOR_ALUGUEL", "value": rent },
                { "description": "VALOR_CONDOMINIO", "value": 450.0 }
            ],
            "planKey": "Basic",
            "occupation": "Residencial",
            "inhabited": true,
            "multiple": 30
        }],
        "paymentConditions": { "paymentType": "Invoice", "installments": 12 }
    })
}

pub fn quote_request(rent: f64) -> QuoteRequest {
    serde_json::from_value(quote_request_json(rent)).expect("fixture is a valid QuoteRequest")
}

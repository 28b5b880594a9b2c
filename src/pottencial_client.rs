use crate::config::PottencialConfig;
use crate::errors::AdapterError;
use crate::insurers::{InsurerAdapter, InsurerProfile, POTTENCIAL};
use crate::models::{status, QuoteRequest, QuoteResult};
use crate::token_cache::AccessToken;
use async_trait::async_trait;
use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const UNKNOWN_ERROR_MESSAGE: &str = "Erro desconhecido da Pottencial";
const DEFAULT_DECLINE_MESSAGE: &str = "Recusado pela política da Pottencial.";
const ACCEPTED_MESSAGE: &str = "Cotação aceita para análise.";

/// Client for the Pottencial rent-guarantee quoting API.
#[derive(Clone)]
pub struct PottencialClient {
    client: Client,
    client_id: String,
    quote_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    quote_id: Option<Value>,
    status: Option<String>,
    total_premium: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

impl PottencialClient {
    /// Creates a new `PottencialClient`.
    ///
    /// # Arguments
    ///
    /// * `config` - Credentials and endpoints of the integration.
    /// * `timeout` - Transport timeout for each quote call.
    pub fn new(config: &PottencialConfig, timeout: Duration) -> Result<Self, AdapterError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AdapterError::new(format!("Failed to create Pottencial client: {}", e))
        })?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            quote_url: config.quote_url.clone(),
        })
    }

    /// Maps a non-success body to the insurer's decline reason.
    fn decline_reason(body: &str) -> String {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(ErrorResponse {
                message: Some(message),
            }) if !message.trim().is_empty() => message,
            Ok(_) => DEFAULT_DECLINE_MESSAGE.to_string(),
            Err(_) => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }
}

#[async_trait]
impl InsurerAdapter for PottencialClient {
    fn profile(&self) -> &InsurerProfile {
        &POTTENCIAL
    }

    async fn quote(
        &self,
        request: &QuoteRequest,
        token: &AccessToken,
    ) -> Result<QuoteResult, AdapterError> {
        tracing::info!("Requesting Pottencial quote: {}", self.quote_url);

        let response = self
            .client
            .post(&self.quote_url)
            .header("Content-Type", "application/json")
            .header("client_id", &self.client_id)
            .header("access_token", &token.token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Pottencial request failed: {}", e);
                AdapterError::from(e)
            })?;

        if !response.status().is_success() {
            let status_code = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Pottencial returned {}: {}", status_code, body);
            return Err(AdapterError::new(Self::decline_reason(&body)));
        }

        // An unreadable success body is treated as an empty object.
        let body = response.text().await.unwrap_or_default();
        let data: QuoteResponse = serde_json::from_str(&body).unwrap_or_default();

        let total_premium = data
            .total_premium
            .as_ref()
            .and_then(premium_from_value)
            .unwrap_or_else(|| derived_premium(request.rent_amount()));
        let quote_id = data
            .quote_id
            .as_ref()
            .and_then(id_from_value)
            .unwrap_or_else(placeholder_quote_id);

        tracing::info!("✓ Pottencial quote {} ({})", quote_id, total_premium);
        Ok(QuoteResult {
            insurer_name: POTTENCIAL.name.to_string(),
            insurer_logo: POTTENCIAL.logo.to_string(),
            quote_id: Some(quote_id),
            status: data
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| status::EM_ANALISE.to_string()),
            total_premium: Some(total_premium),
            message: ACCEPTED_MESSAGE.to_string(),
        })
    }
}

/// Premium estimated from the monthly rent: `rent * 0.08 * 1.05`, rounded
/// half-up to two decimal places.
pub fn derived_premium(rent: f64) -> String {
    // Shortest round-trip representation, so 1234.56 stays 1234.56
    let rent = BigDecimal::from_str(&rent.to_string()).unwrap_or_default();
    let base_rate = BigDecimal::new(BigInt::from(8), 2);
    let loading = BigDecimal::new(BigInt::from(105), 2);

    (rent * base_rate * loading)
        .with_scale_round(2, RoundingMode::HalfUp)
        .to_string()
}

fn premium_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string())
            .ok()
            .map(|d| d.with_scale_round(2, RoundingMode::HalfUp).to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `POT-` followed by seven uppercase alphanumerics.
fn placeholder_quote_id() -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(7)
        .collect();
    format!("POT-{}", suffix.to_uppercase())
}

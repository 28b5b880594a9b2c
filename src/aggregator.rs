//! # Quote Aggregator
//!
//! Resolves the insurer token, fans the request out to every registered
//! insurer concurrently and merges the outcomes into one list.
//!
//! The fan-out is best-effort: every insurer runs to completion (or to its
//! timeout) independently, and a failed insurer becomes a declined
//! [`QuoteResult`] instead of failing the call. Results always follow the
//! registration order, whatever order the insurers finish in.

use crate::config::Config;
use crate::errors::{AdapterError, AuthError};
use crate::insurers::{InsurerAdapter, InsurerProfile, SimulatedInsurer};
use crate::models::{status, QuoteRequest, QuoteResult};
use crate::pottencial_client::PottencialClient;
use crate::token_cache::{AccessToken, TokenCache, TokenGrant, TokenStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Message used when a failed insurer gave no reason.
pub const DEFAULT_DECLINE_MESSAGE: &str = "Não foi possível cotar.";
const TIMEOUT_MESSAGE: &str = "Tempo de resposta da seguradora esgotado.";

/// Result of one aggregation call.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    /// One entry per registered insurer, in registration order.
    pub results: Vec<QuoteResult>,
    /// Token used for the call; `refreshed` tells the caller to persist it.
    pub token: TokenGrant,
}

pub struct QuoteAggregator {
    token_cache: Arc<TokenCache>,
    adapters: Vec<Arc<dyn InsurerAdapter>>,
    insurer_timeout: Duration,
}

impl QuoteAggregator {
    pub fn new(
        token_cache: Arc<TokenCache>,
        adapters: Vec<Arc<dyn InsurerAdapter>>,
        insurer_timeout: Duration,
    ) -> Self {
        Self {
            token_cache,
            adapters,
            insurer_timeout,
        }
    }

    /// Production registry: Pottencial, Porto Seguro, Tokio Marine.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeout = config.insurer_timeout();
        let token_cache = TokenCache::new(&config.pottencial, timeout)
            .map_err(|e| anyhow::anyhow!("Failed to create token cache: {}", e))?;
        let pottencial = PottencialClient::new(&config.pottencial, timeout)
            .map_err(|e| anyhow::anyhow!("Failed to create Pottencial client: {}", e))?;

        let adapters: Vec<Arc<dyn InsurerAdapter>> = vec![
            Arc::new(pottencial),
            Arc::new(SimulatedInsurer::porto_seguro()),
            Arc::new(SimulatedInsurer::tokio_marine()),
        ];

        Ok(Self::new(Arc::new(token_cache), adapters, timeout))
    }

    /// Registered insurers, in result order.
    pub fn insurers(&self) -> Vec<&InsurerProfile> {
        self.adapters.iter().map(|a| a.profile()).collect()
    }

    /// Quotes `request` with every registered insurer.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when no token can be obtained; in that case no
    /// insurer is contacted.
    pub async fn aggregate(
        &self,
        request: &QuoteRequest,
        store: &dyn TokenStore,
    ) -> Result<AggregateOutcome, AuthError> {
        let grant = self.token_cache.acquire(store).await?;

        let results = self
            .collect_from_insurers(Arc::new(request.clone()), Arc::new(grant.token.clone()))
            .await;

        let declined = results.iter().filter(|r| r.is_declined()).count();
        tracing::info!(
            "Aggregated {} insurer result(s), {} declined",
            results.len(),
            declined
        );

        Ok(AggregateOutcome {
            results,
            token: grant,
        })
    }

    /// Runs every adapter as its own task and joins them in registration order.
    async fn collect_from_insurers(
        &self,
        request: Arc<QuoteRequest>,
        token: Arc<AccessToken>,
    ) -> Vec<QuoteResult> {
        let mut handles = Vec::with_capacity(self.adapters.len());

        for adapter in &self.adapters {
            let adapter = Arc::clone(adapter);
            let request = Arc::clone(&request);
            let token = Arc::clone(&token);
            let per_insurer_timeout = self.insurer_timeout;

            handles.push(tokio::spawn(async move {
                match timeout(per_insurer_timeout, adapter.quote(&request, &token)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AdapterError::new(TIMEOUT_MESSAGE)),
                }
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (adapter, handle) in self.adapters.iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("{} quote task failed: {}", adapter.profile().name, e);
                    Err(AdapterError::new(""))
                }
            };
            results.push(settle(adapter.profile(), outcome));
        }

        results
    }
}

/// Keeps a successful result unchanged; turns a failure into a declined
/// result for `profile`.
pub fn settle(profile: &InsurerProfile, outcome: Result<QuoteResult, AdapterError>) -> QuoteResult {
    match outcome {
        Ok(result) => result,
        Err(err) => {
            tracing::info!("{} declined: {}", profile.name, err);
            let message = if err.message().trim().is_empty() {
                DEFAULT_DECLINE_MESSAGE.to_string()
            } else {
                err.message().to_string()
            };
            QuoteResult {
                insurer_name: profile.name.to_string(),
                insurer_logo: profile.logo.to_string(),
                quote_id: None,
                status: status::RECUSADO.to_string(),
                total_premium: None,
                message,
            }
        }
    }
}

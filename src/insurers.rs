//! Insurer adapter port and the simulated integrations.
//!
//! Every insurer is reached through an [`InsurerAdapter`]. The aggregator
//! calls them in the order they are registered and reports their results in
//! that same order.

use crate::errors::AdapterError;
use crate::models::{QuoteRequest, QuoteResult};
use crate::token_cache::AccessToken;
use async_trait::async_trait;

/// Display identity of an insurer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsurerProfile {
    pub name: &'static str,
    /// Path served by the frontend.
    pub logo: &'static str,
}

pub const POTTENCIAL: InsurerProfile = InsurerProfile {
    name: "Pottencial",
    logo: "/assets/pottencial.jpg",
};

pub const PORTO_SEGURO: InsurerProfile = InsurerProfile {
    name: "Porto Seguro",
    logo: "/assets/porto.jpg",
};

pub const TOKIO_MARINE: InsurerProfile = InsurerProfile {
    name: "Tokio Marine",
    logo: "/assets/tokio.png",
};

/// Translates the canonical request into one insurer's API and normalizes
/// the answer.
#[async_trait]
pub trait InsurerAdapter: Send + Sync {
    fn profile(&self) -> &InsurerProfile;

    /// Single attempt, no retries.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the insurer declines, rejects the request
    /// or cannot be reached.
    async fn quote(
        &self,
        request: &QuoteRequest,
        token: &AccessToken,
    ) -> Result<QuoteResult, AdapterError>;
}

/// Placeholder for an insurer whose API is not integrated yet.
///
/// Always declines with a fixed message, so the insurer still shows up in
/// every result list.
#[derive(Debug, Clone)]
pub struct SimulatedInsurer {
    profile: InsurerProfile,
    decline_message: &'static str,
}

impl SimulatedInsurer {
    pub fn new(profile: InsurerProfile, decline_message: &'static str) -> Self {
        Self {
            profile,
            decline_message,
        }
    }

    pub fn porto_seguro() -> Self {
        Self::new(PORTO_SEGURO, "Não aceito pela política da seguradora.")
    }

    pub fn tokio_marine() -> Self {
        Self::new(TOKIO_MARINE, "Perfil de risco não enquadrado.")
    }
}

#[async_trait]
impl InsurerAdapter for SimulatedInsurer {
    fn profile(&self) -> &InsurerProfile {
        &self.profile
    }

    async fn quote(
        &self,
        _request: &QuoteRequest,
        _token: &AccessToken,
    ) -> Result<QuoteResult, AdapterError> {
        tracing::debug!("{} is simulated, declining", self.profile.name);
        Err(AdapterError::new(self.decline_message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[tokio::test]
    async fn test_simulated_insurers_always_decline() {
        let token = AccessToken::new("t", i64::MAX);
        let request = fixtures::quote_request(1000.0);

        let porto = SimulatedInsurer::porto_seguro();
        let err = porto.quote(&request, &token).await.unwrap_err();
        assert_eq!(err.message(), "Não aceito pela política da seguradora.");
        assert_eq!(porto.profile().name, "Porto Seguro");

        let tokio = SimulatedInsurer::tokio_marine();
        let err = tokio.quote(&request, &token).await.unwrap_err();
        assert_eq!(err.message(), "Perfil de risco não enquadrado.");
        assert_eq!(tokio.profile().logo, "/assets/tokio.png");
    }
}

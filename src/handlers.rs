use crate::aggregator::QuoteAggregator;
use crate::config::{Config, TokenStoreKind};
use crate::cotation_store::{CotationFilter, CotationStore};
use crate::errors::AppError;
use crate::models::*;
use crate::session::{SessionVerifier, SESSION_COOKIE};
use crate::token_cache::{
    refreshed_cookies, CookieTokenStore, MemoryTokenStore, EXPIRES_COOKIE, TOKEN_COOKIE,
};
use crate::validation::validate_quote_request;
use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, Route},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tower::layer::util::Identity;
use tower::{Layer, Service};
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Token resolution and insurer fan-out.
    pub aggregator: Arc<QuoteAggregator>,
    /// Process-wide token store; `None` when tokens travel in cookies.
    pub memory_tokens: Option<MemoryTokenStore>,
    /// Verifies the `session` cookie issued by the identity provider.
    pub sessions: SessionVerifier,
    /// Quote history backing the dashboard.
    pub cotations: Arc<dyn CotationStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        aggregator: Arc<QuoteAggregator>,
        cotations: Arc<dyn CotationStore>,
    ) -> Self {
        let memory_tokens = match config.token_store {
            TokenStoreKind::Memory => Some(MemoryTokenStore::new(&config.pottencial.client_id)),
            TokenStoreKind::Cookie => None,
        };
        let sessions = SessionVerifier::new(&config.session_secret);

        Self {
            config,
            aggregator,
            memory_tokens,
            sessions,
            cotations,
        }
    }
}

/// Every route served by the application, without extra middleware.
pub fn router(state: Arc<AppState>) -> Router {
    router_with(state, Identity::new())
}

/// Every route served by the application, with `api_layer` wrapping all
/// routes except `/health`.
pub fn router_with<L>(state: Arc<AppState>, api_layer: L) -> Router
where
    L: Layer<Route> + Clone + Send + 'static,
    L::Service: Service<Request> + Clone + Send + 'static,
    <L::Service as Service<Request>>::Response: IntoResponse + 'static,
    <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
    <L::Service as Service<Request>>::Future: Send + 'static,
{
    Router::new()
        .route("/health", get(health))
        .merge(api_routes().layer(api_layer))
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quote", post(request_quote))
        .route("/api/fianca", post(request_quote))
        .route("/api/cotations", post(create_cotation).get(list_cotations))
        .route("/api/cotations/:id", get(get_cotation))
        .route("/api/auth/logout", post(logout))
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let insurers: Vec<&str> = state
        .aggregator
        .insurers()
        .into_iter()
        .map(|p| p.name)
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-fianca-api",
            "version": env!("CARGO_PKG_VERSION"),
            "insurers": insurers
        })),
    )
}

/// POST /quote
///
/// Quotes the request with every registered insurer and returns one result
/// per insurer, in registration order. Declines are part of the 200 body.
///
/// In cookie mode a refreshed insurer token is written back as two
/// http-only cookies.
///
/// # Errors
///
/// * 401 without a valid session.
/// * 400 when the request fails validation.
/// * 500 when the body is not a quote request or no insurer token can be
///   obtained.
pub async fn request_quote(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<Vec<QuoteResult>>), AppError> {
    let user = state.sessions.verify_jar(&jar)?;

    let request: QuoteRequest = serde_json::from_slice(&body)?;
    validate_quote_request(&request).map_err(|errors| {
        tracing::info!("Quote request rejected: {:?}", errors);
        AppError::BadRequest(errors.join("; "))
    })?;

    tracing::info!(
        "POST /quote - user {} rent {:.2}",
        user.user_id,
        request.rent_amount()
    );

    let outcome = match state.memory_tokens {
        Some(ref store) => state.aggregator.aggregate(&request, store).await?,
        None => {
            let store = CookieTokenStore::from_jar(&jar);
            state.aggregator.aggregate(&request, &store).await?
        }
    };

    let jar = if state.memory_tokens.is_none() && outcome.token.refreshed {
        refreshed_cookies(jar, &outcome.token, state.config.secure_cookies())
    } else {
        jar
    };

    Ok((jar, Json(outcome.results)))
}

/// POST /api/cotations
///
/// Stores a submission with its insurer results for the session's user.
pub async fn create_cotation(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<CreateCotationRequest>,
) -> Result<(StatusCode, Json<CotationRecord>), AppError> {
    let user = state.sessions.verify_jar(&jar)?;

    let record = state
        .cotations
        .insert(NewCotation {
            user_id: user.user_id,
            user_email: user.email,
            payload: body.payload,
            all_insurer_quotes: body.all_insurer_quotes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/cotations
///
/// The session user's cotations, newest first, filtered by status, date
/// window, period preset and free-text search.
pub async fn list_cotations(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CotationQueryParams>,
) -> Result<Json<Vec<CotationRecord>>, AppError> {
    let user = state.sessions.verify_jar(&jar)?;
    tracing::debug!("GET /api/cotations - params: {:?}", params);

    let filter = CotationFilter::from_params(&params, Utc::now().date_naive())?;
    let records = state.cotations.list(&user.user_id, &filter).await?;

    tracing::info!("Found {} cotation(s) for user {}", records.len(), user.user_id);
    Ok(Json(records))
}

/// GET /api/cotations/:id
pub async fn get_cotation(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Json<CotationRecord>, AppError> {
    let user = state.sessions.verify_jar(&jar)?;

    state
        .cotations
        .get(&user.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Cotação {} não encontrada", id)))
}

/// POST /api/auth/logout
///
/// Clears the session and any insurer token cookies.
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = [SESSION_COOKIE, TOKEN_COOKIE, EXPIRES_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| jar.remove(Cookie::build(name).path("/")));

    (jar, StatusCode::NO_CONTENT)
}

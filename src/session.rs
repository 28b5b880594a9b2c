use crate::errors::AppError;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the signed user session issued by the identity provider.
pub const SESSION_COOKIE: &str = "session";

/// Authenticated owner of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
    pub email: String,
}

/// Verifies session cookies of the form
/// `<user_id>|<email>|<expires_at>|<hex hmac-sha256>`.
///
/// The signature covers everything before the last separator and is checked
/// in constant time.
#[derive(Clone)]
pub struct SessionVerifier {
    secret: Vec<u8>,
}

impl SessionVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::InternalError(format!("Invalid session secret: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    /// Produces a cookie value accepted by [`SessionVerifier::verify`].
    pub fn sign(&self, user_id: &str, email: &str, expires_at: i64) -> Result<String, AppError> {
        let payload = format!("{}|{}|{}", user_id, email, expires_at);
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{}|{}", payload, signature))
    }

    /// Checks signature and expiry of a session cookie value.
    pub fn verify(&self, value: &str, now: i64) -> Result<SessionUser, AppError> {
        let (payload, signature) = value
            .rsplit_once('|')
            .ok_or_else(|| AppError::Unauthorized("Malformed session".to_string()))?;
        let signature = hex::decode(signature)
            .map_err(|_| AppError::Unauthorized("Malformed session signature".to_string()))?;

        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| AppError::Unauthorized("Invalid session signature".to_string()))?;

        let mut parts = payload.splitn(3, '|');
        let (Some(user_id), Some(email), Some(expires_at)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AppError::Unauthorized("Malformed session".to_string()));
        };

        let expires_at: i64 = expires_at
            .parse()
            .map_err(|_| AppError::Unauthorized("Malformed session expiry".to_string()))?;
        if expires_at <= now {
            return Err(AppError::Unauthorized("Session expired".to_string()));
        }
        if user_id.is_empty() {
            return Err(AppError::Unauthorized("Session without user".to_string()));
        }

        Ok(SessionUser {
            user_id: user_id.to_string(),
            email: email.to_string(),
        })
    }

    /// Verifies the session cookie of a request.
    pub fn verify_jar(&self, jar: &CookieJar) -> Result<SessionUser, AppError> {
        let cookie = jar
            .get(SESSION_COOKIE)
            .ok_or_else(|| AppError::Unauthorized("Missing session cookie".to_string()))?;
        self.verify(cookie.value(), Utc::now().timestamp())
    }
}

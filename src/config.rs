use serde::Deserialize;
use std::time::Duration;

/// Where the insurer bearer token lives between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    /// Two http-only cookies on the caller's browser.
    Cookie,
    /// One token shared by the whole process.
    Memory,
}

impl std::str::FromStr for TokenStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("TOKEN_STORE must be 'cookie' or 'memory', got '{}'", other),
        }
    }
}

/// Credentials and endpoints of the Pottencial integration.
#[derive(Debug, Clone, Deserialize)]
pub struct PottencialConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub quote_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// `APP_ENV=development` disables the `secure` cookie attribute.
    pub app_env: String,
    /// Absent means cotations are kept in memory only.
    pub database_url: Option<String>,
    pub pottencial: PottencialConfig,
    pub insurer_timeout_secs: u64,
    pub token_store: TokenStoreKind,
    pub session_secret: String,
}

const DEFAULT_TOKEN_URL: &str = "https://api-sandbox.pottencial.com.br/oauth/v3/access-token";
const DEFAULT_QUOTE_URL: &str =
    "https://api-sandbox.pottencial.com.br/insurance/v1/fianca-locaticia/quotes";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            app_env: std::env::var("APP_ENV").unwrap_or_else(|_| "production".to_string()),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            pottencial: PottencialConfig {
                client_id: required("POTTENCIAL_CLIENT_ID")?,
                client_secret: required("POTTENCIAL_CLIENT_SECRET")?,
                token_url: http_url(
                    "POTTENCIAL_TOKEN_URL",
                    std::env::var("POTTENCIAL_TOKEN_URL")
                        .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
                )?,
                quote_url: http_url(
                    "POTTENCIAL_QUOTE_URL",
                    std::env::var("POTTENCIAL_QUOTE_URL")
                        .unwrap_or_else(|_| DEFAULT_QUOTE_URL.to_string()),
                )?,
            },
            insurer_timeout_secs: std::env::var("INSURER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("INSURER_TIMEOUT_SECS must be a positive number"))
                .and_then(|secs: u64| {
                    if secs == 0 {
                        anyhow::bail!("INSURER_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
            token_store: std::env::var("TOKEN_STORE")
                .unwrap_or_else(|_| "cookie".to_string())
                .parse()?,
            session_secret: required("SESSION_SECRET").and_then(|secret| {
                if secret.len() < 32 {
                    anyhow::bail!("SESSION_SECRET must be at least 32 characters");
                }
                Ok(secret)
            })?,
        };

        // Never log credentials or the session secret
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Pottencial token URL: {}", config.pottencial.token_url);
        tracing::debug!("Pottencial quote URL: {}", config.pottencial.quote_url);
        tracing::debug!("Token store: {:?}", config.token_store);
        tracing::debug!("Insurer timeout: {}s", config.insurer_timeout_secs);
        tracing::debug!("Server Port: {}", config.port);
        if config.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set, cotations will be kept in memory");
        }

        Ok(config)
    }

    /// Cookies carry `Secure` everywhere except local development.
    pub fn secure_cookies(&self) -> bool {
        self.app_env != "development"
    }

    pub fn insurer_timeout(&self) -> Duration {
        Duration::from_secs(self.insurer_timeout_secs)
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .map_err(|_| anyhow::anyhow!("{} environment variable required", name))
        .and_then(|value| {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            Ok(value)
        })
}

fn http_url(name: &str, value: String) -> anyhow::Result<String> {
    let parsed = url::Url::parse(&value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(value)
}

use anyhow::{bail, Context, Result};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_EMPLOYERS: &[&str] = &["employer1@example.com", "employer2@example.com"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let storage = StorageConfig {
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| ".".into())),
            document_store: parse_or("DOCUMENT_STORE", DocumentStoreKind::Google)?,
        };

        let (client_id, client_secret) = match storage.document_store {
            DocumentStoreKind::Google => (
                env::var("GOOGLE_CLIENT_ID")
                    .context("GOOGLE_CLIENT_ID environment variable is required")?,
                env::var("GOOGLE_CLIENT_SECRET")
                    .context("GOOGLE_CLIENT_SECRET environment variable is required")?,
            ),
            DocumentStoreKind::Memory => (
                env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
                env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            ),
        };

        let oauth = OAuthConfig {
            client_id,
            client_secret,
            redirect_url: env::var("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:8080/auth/callback".into()),
        };

        let auth = AuthConfig {
            employer_emails: env::var("EMPLOYER_EMAILS")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| AuthConfig::parse_employer_list(&v))
                .unwrap_or_else(|| {
                    DEFAULT_EMPLOYERS.iter().map(|e| e.to_string()).collect()
                }),
            session_max_age: Duration::from_secs(parse_or("SESSION_MAX_AGE_SECS", 86_400)?),
            session_idle_timeout: Duration::from_secs(parse_or("SESSION_IDLE_SECS", 7_200)?),
            session_reap_interval: Duration::from_secs(parse_or(
                "SESSION_REAP_INTERVAL_SECS",
                1_800,
            )?),
        };

        let server = ServerConfig {
            port: parse_or("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 30)?),
        };

        if auth.session_idle_timeout.is_zero() || auth.session_max_age.is_zero() {
            bail!("session lifetimes must be positive");
        }

        Ok(Self {
            server,
            oauth,
            auth,
            storage,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub frontend_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Lower-cased, trimmed identities allowed to act as employers.
    pub employer_emails: Vec<String>,
    pub session_max_age: Duration,
    pub session_idle_timeout: Duration,
    pub session_reap_interval: Duration,
}

impl AuthConfig {
    pub fn parse_employer_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            employer_emails: DEFAULT_EMPLOYERS.iter().map(|e| e.to_string()).collect(),
            session_max_age: Duration::from_secs(86_400),
            session_idle_timeout: Duration::from_secs(7_200),
            session_reap_interval: Duration::from_secs(1_800),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub document_store: DocumentStoreKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DocumentStoreKind {
    Google,
    Memory,
}

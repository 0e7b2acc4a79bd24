use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use kernel::model::{normalize_email, session::AccessCredential, user::UserInfo};
use kernel::repository::identity::IdentityProvider;
use parking_lot::Mutex;
use reqwest::{Client, Url};
use serde::Deserialize;
use shared::{
    config::OAuthConfig,
    error::{AppError, AppResult},
};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::token::random_token;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.file",
];
const STATE_TTL: Duration = Duration::from_secs(600);
const MAX_PENDING_STATES: usize = 1024;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_credential(self, previous_refresh: Option<&str>) -> AccessCredential {
        AccessCredential {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        }
    }
}

/// Authorization-code flow against Google's OAuth endpoints.
pub struct GoogleOAuthClient {
    client: Client,
    config: OAuthConfig,
    // state -> issued at
    pending: Mutex<HashMap<String, Instant>>,
}

impl GoogleOAuthClient {
    pub fn new(client: Client, config: OAuthConfig) -> Self {
        Self {
            client,
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a fresh state. Expired states are dropped first, and at
    /// capacity the oldest pending one makes room.
    fn issue_state(&self) -> String {
        let state = random_token(16);
        let mut pending = self.pending.lock();
        pending.retain(|_, issued| issued.elapsed() < STATE_TTL);
        if pending.len() >= MAX_PENDING_STATES {
            let oldest = pending
                .iter()
                .min_by_key(|(_, issued)| **issued)
                .map(|(s, _)| s.clone());
            if let Some(oldest) = oldest {
                pending.remove(&oldest);
            }
        }
        pending.insert(state.clone(), Instant::now());
        state
    }

    /// Consumes a state value; each one is valid once and only for a while.
    fn take_state(&self, state: &str) -> bool {
        let mut pending = self.pending.lock();
        pending.retain(|_, issued| issued.elapsed() < STATE_TTL);
        pending.remove(state).is_some()
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> AppResult<TokenResponse> {
        let res = self
            .client
            .post(TOKEN_URL)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(%status, "token endpoint rejected request");
            return Err(AppError::ExternalServiceError(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        res.json()
            .await
            .map_err(|e| AppError::ExternalServiceError(e.to_string()))
    }

    async fn user_info(&self, access_token: &str) -> AppResult<UserInfo> {
        let res = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(e.to_string()))?;
        if !res.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "userinfo endpoint returned {}",
                res.status()
            )));
        }
        let mut user: UserInfo = res
            .json()
            .await
            .map_err(|e| AppError::ExternalServiceError(e.to_string()))?;
        user.email = normalize_email(&user.email);
        if user.email.is_empty() {
            return Err(AppError::UnauthenticatedError);
        }
        Ok(user)
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuthClient {
    fn authorize_url(&self) -> String {
        let state = self.issue_state();

        let scope = SCOPES.join(" ");
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state.as_str()),
        ];
        match Url::parse_with_params(AUTHORIZE_URL, &params) {
            Ok(url) => url.into(),
            // AUTHORIZE_URL is a valid constant.
            Err(_) => AUTHORIZE_URL.to_string(),
        }
    }

    async fn exchange(&self, state: &str, code: &str) -> AppResult<(UserInfo, AccessCredential)> {
        if !self.take_state(state) {
            tracing::warn!("login callback with unknown or expired state");
            return Err(AppError::ValidationError("Invalid state parameter".into()));
        }
        if code.is_empty() {
            return Err(AppError::ValidationError("Missing authorization code".into()));
        }

        let token = self
            .token_request(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;
        let credential = token.into_credential(None);
        let user = self.user_info(&credential.access_token).await?;
        Ok((user, credential))
    }

    async fn refresh(&self, credential: &AccessCredential) -> AppResult<AccessCredential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or(AppError::UnauthenticatedError)?;
        let token = self
            .token_request(&[
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        Ok(token.into_credential(Some(refresh_token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleOAuthClient {
        GoogleOAuthClient::new(
            Client::new(),
            OAuthConfig {
                client_id: "client".into(),
                client_secret: "secret".into(),
                redirect_url: "http://localhost:8080/auth/callback".into(),
            },
        )
    }

    fn state_of(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()?
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn authorize_url_requests_offline_access() {
        let url = client().authorize_url();
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("drive.file"));
        assert!(state_of(&url).is_some());
    }

    #[test]
    fn state_is_single_use() {
        let oauth = client();
        let state = state_of(&oauth.authorize_url()).unwrap();
        assert!(oauth.take_state(&state));
        assert!(!oauth.take_state(&state));
        assert!(!oauth.take_state("forged"));
    }

    fn issued_ago(secs: u64) -> Instant {
        Instant::now()
            .checked_sub(Duration::from_secs(secs))
            .unwrap_or_else(Instant::now)
    }

    #[test]
    fn expired_states_are_dropped_when_issuing() {
        let oauth = client();
        {
            let mut pending = oauth.pending.lock();
            for i in 0..5 {
                pending.insert(format!("abandoned-{i}"), issued_ago(STATE_TTL.as_secs() + 1));
            }
        }
        let state = state_of(&oauth.authorize_url()).unwrap();

        let pending = oauth.pending.lock();
        assert_eq!(pending.len(), 1);
        assert!(pending.contains_key(&state));
    }

    #[test]
    fn pending_states_are_capped() {
        let oauth = client();
        {
            let mut pending = oauth.pending.lock();
            pending.insert("oldest".into(), issued_ago(60));
            for i in 1..MAX_PENDING_STATES {
                pending.insert(format!("state-{i}"), Instant::now());
            }
        }
        oauth.authorize_url();

        let pending = oauth.pending.lock();
        assert_eq!(pending.len(), MAX_PENDING_STATES);
        assert!(!pending.contains_key("oldest"));
    }

    #[tokio::test]
    async fn exchange_rejects_unknown_state_before_calling_out() {
        let err = client().exchange("forged", "code").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_is_unauthenticated() {
        let credential = AccessCredential {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: None,
        };
        let err = client().refresh(&credential).await.unwrap_err();
        assert!(matches!(err, AppError::UnauthenticatedError));
    }

    #[test]
    fn refreshed_token_keeps_previous_refresh_token() {
        let token = TokenResponse {
            access_token: "new".into(),
            refresh_token: None,
            expires_in: Some(3600),
        };
        let credential = token.into_credential(Some("old-refresh"));
        assert_eq!(credential.refresh_token.as_deref(), Some("old-refresh"));
        assert!(!credential.is_expired(Utc::now()));
    }
}

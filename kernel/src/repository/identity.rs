use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{session::AccessCredential, user::UserInfo};

/// External login flow; returns a verified identity and its credential.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    // URL the browser is redirected to; registers a one-time state value.
    fn authorize_url(&self) -> String;
    async fn exchange(&self, state: &str, code: &str) -> AppResult<(UserInfo, AccessCredential)>;
    async fn refresh(&self, credential: &AccessCredential) -> AppResult<AccessCredential>;
}

use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    id::SessionToken,
    role::Role,
    session::{AccessCredential, Session},
    user::UserInfo,
};

#[async_trait]
pub trait SessionRepository: Send + Sync {
    // Stores a fresh session and returns its random token.
    async fn create(
        &self,
        user: UserInfo,
        role: Role,
        credential: AccessCredential,
    ) -> AppResult<SessionToken>;
    // Expired sessions are reported as unauthenticated even before reaping.
    async fn get(&self, token: &SessionToken) -> AppResult<Session>;
    // Slides last-used-at forward.
    async fn touch(&self, token: &SessionToken) -> AppResult<()>;
    // Replaces the credential after a renewal.
    async fn update_credential(
        &self,
        token: &SessionToken,
        credential: AccessCredential,
    ) -> AppResult<()>;
    async fn revoke(&self, token: &SessionToken) -> AppResult<Option<Session>>;
    // Removes every expired session and returns how many were dropped.
    async fn reap_expired(&self) -> AppResult<usize>;
}

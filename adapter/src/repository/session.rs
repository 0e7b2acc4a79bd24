use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kernel::model::{
    id::SessionToken,
    role::Role,
    session::{AccessCredential, Session},
    user::UserInfo,
};
use kernel::repository::session::SessionRepository;
use parking_lot::RwLock;
use shared::error::{AppError, AppResult};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::token::random_token;

const TOKEN_BYTES: usize = 32;

pub struct SessionRepositoryImpl {
    sessions: RwLock<HashMap<SessionToken, Session>>,
    max_age: chrono::Duration,
    idle_timeout: chrono::Duration,
}

impl SessionRepositoryImpl {
    pub fn new(max_age: Duration, idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_age: to_chrono(max_age),
            idle_timeout: to_chrono(idle_timeout),
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        session.is_expired(now, self.max_age, self.idle_timeout)
    }

    fn live_mut<'a>(
        sessions: &'a mut HashMap<SessionToken, Session>,
        token: &SessionToken,
    ) -> AppResult<&'a mut Session> {
        sessions.get_mut(token).ok_or(AppError::UnauthenticatedError)
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, token: &SessionToken, by: chrono::Duration) {
        if let Some(s) = self.sessions.write().get_mut(token) {
            s.created_at -= by;
            s.last_used_at -= by;
        }
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

#[async_trait]
impl SessionRepository for SessionRepositoryImpl {
    async fn create(
        &self,
        user: UserInfo,
        role: Role,
        credential: AccessCredential,
    ) -> AppResult<SessionToken> {
        let token = SessionToken::new(random_token(TOKEN_BYTES));
        let now = Utc::now();
        self.sessions.write().insert(
            token.clone(),
            Session {
                user,
                credential,
                role,
                created_at: now,
                last_used_at: now,
            },
        );
        Ok(token)
    }

    async fn get(&self, token: &SessionToken) -> AppResult<Session> {
        let sessions = self.sessions.read();
        let session = sessions.get(token).ok_or(AppError::UnauthenticatedError)?;
        if self.is_expired(session, Utc::now()) {
            return Err(AppError::UnauthenticatedError);
        }
        Ok(session.clone())
    }

    async fn touch(&self, token: &SessionToken) -> AppResult<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let session = Self::live_mut(&mut sessions, token)?;
        if self.is_expired(session, now) {
            return Err(AppError::UnauthenticatedError);
        }
        session.last_used_at = now;
        Ok(())
    }

    async fn update_credential(
        &self,
        token: &SessionToken,
        credential: AccessCredential,
    ) -> AppResult<()> {
        let mut sessions = self.sessions.write();
        Self::live_mut(&mut sessions, token)?.credential = credential;
        Ok(())
    }

    async fn revoke(&self, token: &SessionToken) -> AppResult<Option<Session>> {
        Ok(self.sessions.write().remove(token))
    }

    async fn reap_expired(&self) -> AppResult<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        Ok(before - sessions.len())
    }
}

/// Periodically drops expired sessions.
pub fn spawn_reaper(sessions: Arc<dyn SessionRepository>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            match sessions.reap_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(removed = n, "reaped expired sessions"),
                Err(e) => tracing::warn!(error.message = %e, "session reaping failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> SessionRepositoryImpl {
        SessionRepositoryImpl::new(Duration::from_secs(86_400), Duration::from_secs(7_200))
    }

    fn user() -> UserInfo {
        UserInfo {
            id: "42".into(),
            email: "alice@example.com".into(),
            name: "Alice".into(),
            picture: String::new(),
        }
    }

    fn credential() -> AccessCredential {
        AccessCredential {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn created_session_is_retrievable() -> anyhow::Result<()> {
        let repo = repo();
        let token = repo.create(user(), Role::Employee, credential()).await?;
        assert_eq!(token.as_str().len(), 43);

        let session = repo.get(&token).await?;
        assert_eq!(session.identity(), "alice@example.com");
        assert_eq!(session.role, Role::Employee);
        Ok(())
    }

    #[tokio::test]
    async fn tokens_are_unique() -> anyhow::Result<()> {
        let repo = repo();
        let a = repo.create(user(), Role::Employee, credential()).await?;
        let b = repo.create(user(), Role::Employee, credential()).await?;
        assert_ne!(a, b);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_is_unauthenticated() {
        let err = repo().get(&SessionToken::new("nope")).await.unwrap_err();
        assert!(matches!(err, AppError::UnauthenticatedError));
    }

    #[tokio::test]
    async fn idle_session_is_rejected_then_reaped() -> anyhow::Result<()> {
        let repo = repo();
        let stale = repo.create(user(), Role::Employee, credential()).await?;
        let fresh = repo.create(user(), Role::Employee, credential()).await?;
        repo.backdate(&stale, chrono::Duration::hours(3));

        assert!(matches!(
            repo.get(&stale).await.unwrap_err(),
            AppError::UnauthenticatedError
        ));
        assert!(repo.touch(&stale).await.is_err());
        assert_eq!(repo.reap_expired().await?, 1);
        assert!(repo.get(&fresh).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn revoke_removes_session() -> anyhow::Result<()> {
        let repo = repo();
        let token = repo.create(user(), Role::Employer, credential()).await?;
        assert!(repo.revoke(&token).await?.is_some());
        assert!(repo.revoke(&token).await?.is_none());
        assert!(repo.get(&token).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn credential_can_be_replaced() -> anyhow::Result<()> {
        let repo = repo();
        let token = repo.create(user(), Role::Employer, credential()).await?;
        let renewed = AccessCredential {
            access_token: "renewed".into(),
            ..credential()
        };
        repo.update_credential(&token, renewed).await?;
        assert_eq!(repo.get(&token).await?.credential.access_token, "renewed");
        Ok(())
    }
}

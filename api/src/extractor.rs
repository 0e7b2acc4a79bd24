use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use kernel::model::{
    id::SessionToken,
    role::Role,
    session::{AccessCredential, Session},
    user::UserInfo,
};
use registry::AppRegistry;
use shared::error::AppError;

pub const SESSION_COOKIE: &str = "session_id";

pub struct AuthorizedUser {
    pub token: SessionToken,
    pub session: Session,
}

impl AuthorizedUser {
    pub fn identity(&self) -> &str {
        self.session.identity()
    }

    pub fn role(&self) -> Role {
        self.session.role
    }

    pub fn credential(&self) -> &AccessCredential {
        &self.session.credential
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.session.user
    }

    pub fn is_employer(&self) -> bool {
        self.role() == Role::Employer
    }

    pub fn require_employer(&self) -> Result<(), AppError> {
        if self.is_employer() {
            Ok(())
        } else {
            Err(AppError::ForbiddenOperation(
                "Only employers can perform this action".into(),
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppRegistry> for AuthorizedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        registry: &AppRegistry,
    ) -> Result<Self, Self::Rejection> {
        let token = CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|c| SessionToken::new(c.value()))
            .ok_or(AppError::UnauthenticatedError)?;

        let sessions = registry.session_repository();
        sessions.touch(&token).await?;
        let mut session = sessions.get(&token).await?;

        // Renew before handlers hand the credential to the document store.
        if session.credential.is_expired(Utc::now()) {
            match registry.identity_provider().refresh(&session.credential).await {
                Ok(renewed) => {
                    sessions.update_credential(&token, renewed.clone()).await?;
                    session.credential = renewed;
                }
                Err(e) => {
                    tracing::warn!(
                        identity = session.identity(),
                        error.message = %e,
                        "failed to renew access credential"
                    );
                }
            }
        }

        Ok(Self { token, session })
    }
}

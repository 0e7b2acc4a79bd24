use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use kernel::model::{id::SessionToken, role::Role};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};
use std::time::Duration;

use crate::{
    extractor::{AuthorizedUser, SESSION_COOKIE},
    model::{
        user::{CallbackQuery, UserInfoResponse, UserResponse},
        MessageResponse,
    },
};

fn session_cookie(token: &SessionToken, max_age: Duration) -> AppResult<Cookie<'static>> {
    Cookie::parse(format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        max_age.as_secs()
    ))
    .map_err(|e| AppError::ConversionEntityError(e.to_string()))
}

pub async fn login(State(registry): State<AppRegistry>) -> Redirect {
    Redirect::temporary(&registry.identity_provider().authorize_url())
}

pub async fn callback(
    Query(query): Query<CallbackQuery>,
    State(registry): State<AppRegistry>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    if let Some(error) = query.error {
        return Err(AppError::ValidationError(format!("Login failed: {error}")));
    }

    let (user, credential) = registry
        .identity_provider()
        .exchange(&query.state, &query.code)
        .await?;

    let role = registry.shop_repository().resolve_role(&user.email).await;
    if role == Role::Unauthorized {
        tracing::warn!(identity = %user.email, "login refused for unknown identity");
        return Err(AppError::ForbiddenOperation(
            "Access denied: this account is not registered as an employer or employee".into(),
        ));
    }

    let identity = user.email.clone();
    let token = registry
        .session_repository()
        .create(user, role, credential)
        .await?;
    tracing::info!(%identity, %role, "signed in");

    let config = registry.app_config();
    let cookie = session_cookie(&token, config.auth.session_max_age)?;
    Ok((
        jar.add(cookie),
        Redirect::temporary(&config.server.frontend_url),
    ))
}

pub async fn show_current_user(user: AuthorizedUser) -> Json<UserResponse> {
    Json(UserResponse {
        user_info: UserInfoResponse::from(user.user_info().clone()),
        role: user.role(),
    })
}

pub async fn logout(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    registry.session_repository().revoke(&user.token).await?;
    registry.document_provisioner().evict_client(user.identity());
    tracing::info!(identity = user.identity(), "signed out");

    Ok((
        jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/")),
        Json(MessageResponse::new("Logged out")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only_and_scoped_to_root() -> anyhow::Result<()> {
        let cookie = session_cookie(&SessionToken::new("abc"), Duration::from_secs(86_400))?;
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.to_string().contains("Max-Age=86400"));
        Ok(())
    }
}

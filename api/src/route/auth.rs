use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::auth::{callback, login, logout, show_current_user};

pub fn build_auth_routers() -> Router<AppRegistry> {
    Router::new()
        .route("/auth/google", get(login))
        .route("/auth/callback", get(callback))
        .route("/user", get(show_current_user))
        .route("/logout", post(logout))
}

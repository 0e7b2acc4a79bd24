use axum::Router;
use registry::AppRegistry;

pub mod auth;
pub mod health;
pub mod schedule;
pub mod shop;

pub fn routes() -> Router<AppRegistry> {
    let api = Router::new()
        .merge(shop::build_shop_routers())
        .merge(schedule::build_schedule_routers());

    Router::new()
        .merge(health::build_health_check_routers())
        .merge(auth::build_auth_routers())
        .nest("/api", api)
}

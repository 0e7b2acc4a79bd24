use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    schedule::{show_schedule, update_schedule},
    spreadsheet::open_spreadsheet,
};

pub fn build_schedule_routers() -> Router<AppRegistry> {
    Router::new()
        .route("/spreadsheet", post(open_spreadsheet))
        .route("/schedule", get(show_schedule))
        .route("/schedule/update", post(update_schedule))
}

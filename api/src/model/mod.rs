use chrono::{Datelike, Utc};
use serde::Serialize;

pub mod employee;
pub mod schedule;
pub mod shop;
pub mod spreadsheet;
pub mod user;

/// Missing or unparsable years fall back to the current one.
pub fn year_or_current(raw: Option<&str>) -> i32 {
    raw.and_then(|y| y.trim().parse().ok())
        .unwrap_or_else(|| Utc::now().year())
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of a registry change whose document side effects may have partly failed.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub sync_errors: Vec<String>,
}

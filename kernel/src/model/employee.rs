use serde::{Deserialize, Serialize};

/// Rate applied when an employer submits a non-positive hourly rate.
pub const DEFAULT_HOURLY_RATE: f64 = 30.0;

/// Roster entry of a shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub email: String,
    pub name: String,
    pub hourly_rate: f64,
}

impl Employee {
    pub fn effective_rate(rate: f64) -> f64 {
        if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            DEFAULT_HOURLY_RATE
        }
    }
}

use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::model::{id::ShopId, shop::ShopSummary};
use serde::{Deserialize, Serialize};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateShopRequest {
    #[garde(length(min = 1, max = 200))]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateShopResponse {
    pub message: String,
    pub shop_id: ShopId,
}

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub shop_id: ShopId,
}

#[derive(Debug, Serialize)]
pub struct ShopSummaryResponse {
    pub id: ShopId,
    pub name: String,
    pub employee_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ShopSummary> for ShopSummaryResponse {
    fn from(value: ShopSummary) -> Self {
        let ShopSummary {
            id,
            name,
            employee_count,
            created_at,
            updated_at,
        } = value;
        Self {
            id,
            name,
            employee_count,
            created_at: format_timestamp(created_at),
            updated_at: format_timestamp(updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShopsResponse {
    pub shops: Vec<ShopSummaryResponse>,
}

impl From<Vec<ShopSummary>> for ShopsResponse {
    fn from(value: Vec<ShopSummary>) -> Self {
        Self {
            shops: value.into_iter().map(ShopSummaryResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn summary_timestamps_use_plain_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 0).unwrap();
        let response = ShopSummaryResponse::from(ShopSummary {
            id: ShopId::new(),
            name: "Downtown".into(),
            employee_count: 2,
            created_at: at,
            updated_at: at,
        });
        assert_eq!(response.created_at, "2025-03-07 09:05:00");
    }
}

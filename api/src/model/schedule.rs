use kernel::model::{document::Grid, id::ShopId, schedule::RowKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::employee::EmployeeResponse;

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub month: String,
    pub shop_id: ShopId,
    pub year: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub month: String,
    pub year: i32,
    pub data: Grid,
    pub employees: BTreeMap<String, EmployeeResponse>,
    /// Present when the tab has the expected month layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_kinds: Option<Vec<RowKind>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    pub month: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub shop_id: ShopId,
    pub data: Grid,
}

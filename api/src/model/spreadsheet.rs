use kernel::model::{document::Grid, id::ShopId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::employee::EmployeeResponse;

#[derive(Debug, Deserialize)]
pub struct SpreadsheetQuery {
    pub shop_id: ShopId,
    pub year: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpreadsheetResponse {
    pub spreadsheet_id: String,
    pub spreadsheet_url: String,
    pub title: String,
    pub shop_id: ShopId,
    pub shop_name: String,
    pub year: i32,
    pub current_month: String,
    pub sheets: Vec<String>,
    /// Management tab contents.
    pub data: Grid,
    pub employees: BTreeMap<String, EmployeeResponse>,
    pub created: bool,
    pub read_only: bool,
}

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use kernel::model::{
    document::grid_range,
    schedule::{month::Month, ScheduleGrid},
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    handler::shop::accessible_shop,
    model::{
        employee::employee_map,
        schedule::{ScheduleQuery, ScheduleResponse, UpdateScheduleRequest},
        year_or_current, MessageResponse,
    },
};

const SCHEDULE_READ_ROWS: usize = 50;
const SCHEDULE_READ_COLUMNS: usize = 26;

fn parse_month(raw: &str) -> AppResult<Month> {
    raw.parse::<Month>()
        .map_err(|e| AppError::ValidationError(e.to_string()))
}

pub async fn show_schedule(
    user: AuthorizedUser,
    Query(query): Query<ScheduleQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ScheduleResponse>> {
    let month = parse_month(&query.month)?;
    let year = year_or_current(query.year.as_deref());
    let (employer, shop) = accessible_shop(&registry, &user, query.shop_id).await?;

    let provisioner = registry.document_provisioner();
    let document = provisioner
        .open_year_document(user.identity(), user.credential(), &employer, &shop, year, false)
        .await?;
    let data = provisioner
        .read_range(
            user.identity(),
            user.credential(),
            &document.meta.id,
            &grid_range(month.tab_name(), SCHEDULE_READ_COLUMNS, SCHEDULE_READ_ROWS),
        )
        .await?;
    let row_kinds = ScheduleGrid::from_values(month, year, &data)
        .ok()
        .map(|grid| grid.row_kinds());

    Ok(Json(ScheduleResponse {
        month: month.tab_name().to_string(),
        year,
        data,
        employees: employee_map(shop.roster()),
        row_kinds,
    }))
}

pub async fn update_schedule(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateScheduleRequest>,
) -> AppResult<Json<MessageResponse>> {
    user.require_employer()?;
    let month = parse_month(&req.month)?;
    let year = req.year.unwrap_or_else(|| Utc::now().year());

    let shop = registry
        .shop_repository()
        .find_shop(user.identity(), req.shop_id)
        .await?;
    let mut grid = ScheduleGrid::from_values(month, year, &req.data)?;
    let rates: Vec<f64> = shop.roster().iter().map(|e| e.hourly_rate).collect();
    grid.recompute_summaries(&rates);

    let provisioner = registry.document_provisioner();
    let document = provisioner
        .open_year_document(
            user.identity(),
            user.credential(),
            user.identity(),
            &shop,
            year,
            false,
        )
        .await?;
    provisioner
        .write_range(
            user.identity(),
            user.credential(),
            &document.meta.id,
            &grid.range(),
            grid.to_values(),
        )
        .await?;

    tracing::info!(shop_id = %shop.id, year, month = %month, "schedule updated");
    Ok(Json(MessageResponse::new("Schedule updated successfully")))
}

use axum::{
    extract::{Query, State},
    Json,
};
use kernel::model::{document::MANAGEMENT_RANGE, role::Role, schedule::month::Month};
use registry::AppRegistry;
use shared::error::AppResult;

use crate::{
    extractor::AuthorizedUser,
    handler::shop::accessible_shop,
    model::{
        employee::employee_map,
        spreadsheet::{SpreadsheetQuery, SpreadsheetResponse},
        year_or_current,
    },
};

pub async fn open_spreadsheet(
    user: AuthorizedUser,
    Query(query): Query<SpreadsheetQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<SpreadsheetResponse>> {
    let year = year_or_current(query.year.as_deref());
    let (employer, shop) = accessible_shop(&registry, &user, query.shop_id).await?;
    let read_only = user.role() != Role::Employer;

    let provisioner = registry.document_provisioner();
    let document = provisioner
        .open_year_document(
            user.identity(),
            user.credential(),
            &employer,
            &shop,
            year,
            !read_only,
        )
        .await?;
    let data = provisioner
        .read_range(
            user.identity(),
            user.credential(),
            &document.meta.id,
            MANAGEMENT_RANGE,
        )
        .await?;

    Ok(Json(SpreadsheetResponse {
        spreadsheet_url: document.meta.url(),
        spreadsheet_id: document.meta.id.to_string(),
        title: document.meta.title,
        shop_id: shop.id,
        shop_name: shop.name.clone(),
        year,
        current_month: Month::current().tab_name().to_string(),
        sheets: document.meta.sheets,
        data,
        employees: employee_map(shop.roster()),
        created: document.created,
        read_only,
    }))
}

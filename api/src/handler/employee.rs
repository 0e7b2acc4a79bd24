use axum::{
    extract::{Query, State},
    Json,
};
use garde::Validate;
use kernel::model::{
    normalize_email,
    shop::{event::RemoveEmployee, RosterChange},
};
use registry::AppRegistry;
use shared::error::AppResult;

use crate::{
    extractor::AuthorizedUser,
    model::{
        employee::{
            AddEmployeeRequest, AddEmployeeRequestWithEmployer, EmployeeResponse,
            EmployeesResponse, RemoveEmployeeRequest, RemoveEmployeeRequestWithEmployer,
        },
        shop::ShopQuery,
        SyncResponse,
    },
};

pub async fn show_employee_list(
    user: AuthorizedUser,
    Query(query): Query<ShopQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EmployeesResponse>> {
    user.require_employer()?;

    registry
        .shop_repository()
        .find_shop(user.identity(), query.shop_id)
        .await
        .map(|shop| EmployeesResponse {
            employees: shop
                .roster()
                .into_iter()
                .map(EmployeeResponse::from)
                .collect(),
        })
        .map(Json)
}

pub async fn register_employee(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<AddEmployeeRequest>,
) -> AppResult<Json<SyncResponse>> {
    user.require_employer()?;
    req.validate()?;

    let email = normalize_email(&req.employee_email);
    let shop = registry
        .shop_repository()
        .add_employee(AddEmployeeRequestWithEmployer::new(user.identity().to_string(), req).into())
        .await?;
    let sync_errors = registry
        .document_provisioner()
        .sync_roster_change(
            user.identity(),
            user.credential(),
            user.identity(),
            &shop,
            &RosterChange::Added(email),
        )
        .await;

    Ok(Json(SyncResponse {
        message: "Employee added successfully".into(),
        sync_errors,
    }))
}

pub async fn delete_employee(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<RemoveEmployeeRequest>,
) -> AppResult<Json<SyncResponse>> {
    user.require_employer()?;
    req.validate()?;

    let event: RemoveEmployee =
        RemoveEmployeeRequestWithEmployer::new(user.identity().to_string(), req).into();
    let email = normalize_email(&event.email);
    let shop = registry.shop_repository().remove_employee(event).await?;
    let sync_errors = registry
        .document_provisioner()
        .sync_roster_change(
            user.identity(),
            user.credential(),
            user.identity(),
            &shop,
            &RosterChange::Removed(email),
        )
        .await;

    Ok(Json(SyncResponse {
        message: "Employee removed successfully".into(),
        sync_errors,
    }))
}

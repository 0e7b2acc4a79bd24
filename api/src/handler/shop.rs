use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{
    id::ShopId,
    role::Role,
    shop::{
        event::{CreateShop, DeleteShop},
        Shop,
    },
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::{
        shop::{CreateShopRequest, CreateShopResponse, ShopQuery, ShopsResponse},
        SyncResponse,
    },
};

/// Shop the caller may look at, with its owning employer. Employees must be
/// on the shop's roster.
pub(crate) async fn accessible_shop(
    registry: &AppRegistry,
    user: &AuthorizedUser,
    shop_id: ShopId,
) -> AppResult<(String, Shop)> {
    let shops = registry.shop_repository();
    match user.role() {
        Role::Employer => {
            let shop = shops.find_shop(user.identity(), shop_id).await?;
            Ok((user.identity().to_string(), shop))
        }
        Role::Employee => shops
            .find_employer_and_shop(shop_id, user.identity())
            .await
            .map_err(|e| match e {
                AppError::EntityNotFound(_) => {
                    AppError::ForbiddenOperation("You don't have access to this shop".into())
                }
                other => other,
            }),
        Role::Unauthorized => Err(AppError::ForbiddenOperation(
            "You don't have access to this shop".into(),
        )),
    }
}

pub async fn show_shop_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ShopsResponse>> {
    registry
        .shop_repository()
        .list_shops_for(user.identity(), user.role())
        .await
        .map(ShopsResponse::from)
        .map(Json)
}

pub async fn register_shop(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateShopRequest>,
) -> AppResult<(StatusCode, Json<CreateShopResponse>)> {
    user.require_employer()?;
    req.validate()?;

    registry
        .shop_repository()
        .create_shop(CreateShop::new(user.identity().to_string(), req.name))
        .await
        .map(|shop_id| {
            (
                StatusCode::CREATED,
                Json(CreateShopResponse {
                    message: "Shop created successfully".into(),
                    shop_id,
                }),
            )
        })
}

pub async fn delete_shop(
    user: AuthorizedUser,
    Query(query): Query<ShopQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<SyncResponse>> {
    user.require_employer()?;

    let removed = registry
        .shop_repository()
        .delete_shop(DeleteShop::new(user.identity().to_string(), query.shop_id))
        .await?;
    let sync_errors = registry
        .document_provisioner()
        .revoke_shop(user.identity(), user.credential(), &removed)
        .await;

    Ok(Json(SyncResponse {
        message: "Shop deleted successfully".into(),
        sync_errors,
    }))
}

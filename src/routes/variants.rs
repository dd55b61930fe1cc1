use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use uuid::Uuid;

use crate::{
    dto::products::UpdateVariantRequest,
    error::AppResult,
    middleware::{auth::AuthUser, json::AppJson},
    models::Variant,
    response::ApiResponse,
    services::variant_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", put(update_variant).delete(delete_variant))
}

#[utoipa::path(
    put,
    path = "/api/variants/{id}",
    params(("id" = Uuid, Path, description = "Variant ID")),
    request_body = UpdateVariantRequest,
    responses(
        (status = 200, description = "Updated variant (admin only)", body = ApiResponse<Variant>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Size and color already exist for this product"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateVariantRequest>,
) -> AppResult<Json<ApiResponse<Variant>>> {
    let resp = variant_service::update_variant(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/variants/{id}",
    params(("id" = Uuid, Path, description = "Variant ID")),
    responses(
        (status = 200, description = "Deleted variant (admin only)"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = variant_service::delete_variant(&state, &user, id).await?;
    Ok(Json(resp))
}

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateVariantRequest, UpdateVariantRequest, VariantList},
    entity::{
        Products,
        variants::{ActiveModel, Column, Entity as Variants},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Variant,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_variants(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<VariantList>> {
    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let items: Vec<Variant> = Variants::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_asc(Column::Size)
        .order_by_asc(Column::Color)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Variant::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Variants",
        VariantList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_variant(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateVariantRequest,
) -> AppResult<ApiResponse<Variant>> {
    ensure_admin(user)?;
    if payload.stock < 0 {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    ensure_unique(state, product_id, &payload.size, &payload.color, None).await?;

    let variant = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        size: Set(payload.size),
        color: Set(payload.color),
        stock: Set(payload.stock),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "variant_create",
        "variants",
        serde_json::json!({ "variant_id": variant.id, "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Variant created",
        Variant::from(variant),
        Some(Meta::empty()),
    ))
}

pub async fn update_variant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateVariantRequest,
) -> AppResult<ApiResponse<Variant>> {
    ensure_admin(user)?;
    if payload.stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }

    let existing = Variants::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let size = payload.size.unwrap_or_else(|| existing.size.clone());
    let color = payload.color.unwrap_or_else(|| existing.color.clone());
    if size != existing.size || color != existing.color {
        ensure_unique(state, existing.product_id, &size, &color, Some(id)).await?;
    }

    let mut active: ActiveModel = existing.into();
    active.size = Set(size);
    active.color = Set(color);
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    let variant = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "variant_update",
        "variants",
        serde_json::json!({ "variant_id": variant.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Variant::from(variant),
        Some(Meta::empty()),
    ))
}

pub async fn delete_variant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Variants::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "variant_delete",
        "variants",
        serde_json::json!({ "variant_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// (product, size, color) identifies a variant.
async fn ensure_unique(
    state: &AppState,
    product_id: Uuid,
    size: &str,
    color: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Variants::find()
        .filter(Column::ProductId.eq(product_id))
        .filter(Column::Size.eq(size))
        .filter(Column::Color.eq(color));
    if let Some(id) = except {
        finder = finder.filter(Column::Id.ne(id));
    }
    if finder.one(&state.orm).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Variant {size} / {color} already exists for this product"
        )));
    }
    Ok(())
}

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::addresses::{AddressList, CreateAddressRequest},
    entity::{
        Addresses,
        addresses::{ActiveModel, Column, Model as AddressModel},
    },
    error::{AppError, AppResult, OrderError, parse_id},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Resolve the shipping address of an order and make sure the caller owns it.
/// Unknown, malformed, and foreign ids are indistinguishable to the caller.
pub async fn verify_shipping_address<C: ConnectionTrait>(
    conn: &C,
    raw_id: Option<&str>,
    user_id: Uuid,
) -> AppResult<AddressModel> {
    let id = raw_id
        .and_then(parse_id)
        .ok_or(OrderError::InvalidShippingAddress)?;
    let found = Addresses::find_by_id(id).one(conn).await?;
    Ok(owned_by(found, user_id)?)
}

fn owned_by(found: Option<AddressModel>, user_id: Uuid) -> Result<AddressModel, OrderError> {
    found
        .filter(|address| address.user_id == user_id)
        .ok_or(OrderError::InvalidShippingAddress)
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items: Vec<Address> = Addresses::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Address::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let CreateAddressRequest {
        address,
        city,
        country,
        postal_code,
        phone,
    } = payload;
    for (field, value) in [
        ("address", &address),
        ("city", &city),
        ("country", &country),
        ("postal_code", &postal_code),
        ("phone", &phone),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} is required")));
        }
    }

    let created = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        address: Set(address),
        city: Set(city),
        country: Set(country),
        postal_code: Set(postal_code),
        phone: Set(phone),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "address_create",
        "addresses",
        serde_json::json!({ "address_id": created.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Address created",
        Address::from(created),
        Some(Meta::empty()),
    ))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Addresses::delete_many()
        .filter(Column::Id.eq(id))
        .filter(Column::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(owner: Uuid) -> AddressModel {
        AddressModel {
            id: Uuid::new_v4(),
            user_id: owner,
            address: "1 Crab Lane".into(),
            city: "Portland".into(),
            country: "US".into(),
            postal_code: "97201".into(),
            phone: "555-0100".into(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn owner_gets_the_address_back() {
        let owner = Uuid::new_v4();
        let found = address(owner);
        assert_eq!(owned_by(Some(found.clone()), owner), Ok(found));
    }

    #[test]
    fn foreign_and_missing_addresses_look_the_same() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        assert_eq!(
            owned_by(Some(address(owner)), stranger),
            Err(OrderError::InvalidShippingAddress)
        );
        assert_eq!(owned_by(None, owner), Err(OrderError::InvalidShippingAddress));
    }
}

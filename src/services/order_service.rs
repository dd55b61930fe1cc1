use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderDetail, OrderItemView, OrderList, OrderUser},
    entity::{
        Addresses, Orders, Products, Users,
        addresses::Model as AddressModel,
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, LineItems, Model as OrderModel,
            OrderStatus,
        },
        products::{Column as ProdCol, Model as ProductModel},
        users::Model as UserModel,
    },
    error::{AppError, AppResult, OrderError},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Address, Order, PaymentResult},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        address_service::verify_shipping_address,
        catalog::OrmCatalog,
        order_assembler::{assemble_order_items, line_items},
        order_lifecycle::{Lifecycle, Transition},
        stock::{release_stock, reserve_stock},
    },
    state::AppState,
};

/// Client-computed price breakdown, checked once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub items: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl PriceBreakdown {
    pub fn from_request(payload: &CreateOrderRequest) -> AppResult<Self> {
        let total = payload
            .total_price
            .ok_or_else(|| AppError::BadRequest("totalPrice is required".into()))?;
        Ok(Self {
            items: money("itemsPrice", payload.items_price.unwrap_or_default())?,
            tax: money("taxPrice", payload.tax_price.unwrap_or_default())?,
            shipping: money("shippingPrice", payload.shipping_price.unwrap_or_default())?,
            total: money("totalPrice", total)?,
        })
    }
}

fn money(field: &str, value: Decimal) -> AppResult<Decimal> {
    if value < Decimal::ZERO {
        return Err(AppError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(value.round_dp(2))
}

/// Place an order: validate, reserve stock, and write the order in one transaction.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.order_items.is_empty() {
        return Err(OrderError::NoOrderItems.into());
    }
    let payment_method = payload
        .payment_method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("paymentMethod is required".into()))?
        .to_string();
    let prices = PriceBreakdown::from_request(&payload)?;

    // Dropping the transaction on any early return rolls back stock reservations.
    let txn = state.orm.begin().await?;

    let address =
        verify_shipping_address(&txn, payload.shipping_address.as_deref(), user.user_id).await?;
    let assembled = assemble_order_items(&OrmCatalog::new(&txn), &payload.order_items).await?;
    reserve_stock(&txn, &assembled).await?;

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        order_items: Set(LineItems(line_items(assembled))),
        shipping_address_id: Set(address.id),
        payment_method: Set(payment_method),
        items_price: Set(prices.items),
        tax_price: Set(prices.tax),
        shipping_price: Set(prices.shipping),
        total_price: Set(prices.total),
        is_paid: Set(false),
        paid_at: Set(None),
        payment_result: Set(None),
        is_delivered: Set(false),
        delivered_at: Set(None),
        status: Set(OrderStatus::Pending),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        items = order.order_items.0.len(),
        total = %order.total_price,
        "order created"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_price": order.total_price }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Denormalized order view for its owner or an admin.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|o| o.user_id == user.user_id || user.is_admin())
        .ok_or(AppError::NotFound)?;

    let owner = Users::find_by_id(order.user_id).one(&state.orm).await?;
    let address = Addresses::find_by_id(order.shipping_address_id)
        .one(&state.orm)
        .await?;
    let product_ids: Vec<Uuid> = order.order_items.0.iter().map(|i| i.product).collect();
    let products = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        order_detail(order, owner, address, products),
        Some(Meta::empty()),
    ))
}

fn order_detail(
    order: OrderModel,
    owner: Option<UserModel>,
    address: Option<AddressModel>,
    products: Vec<ProductModel>,
) -> OrderDetail {
    let products: HashMap<Uuid, ProductModel> =
        products.into_iter().map(|p| (p.id, p)).collect();
    let order = Order::from(order);
    let items = order
        .order_items
        .iter()
        .cloned()
        .map(|item| {
            let product = products.get(&item.product);
            OrderItemView {
                name: product.map(|p| p.name.clone()),
                image: product.and_then(|p| p.image.clone()),
                item,
            }
        })
        .collect();

    OrderDetail {
        order,
        user: owner.map(|u| OrderUser {
            id: u.id,
            email: u.email,
            name: u.name,
        }),
        shipping_address: address.map(Address::from),
        items,
    }
}

pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payment: Option<PaymentResult>,
) -> AppResult<ApiResponse<Order>> {
    let order = transition_order(state, user, id, Transition::Pay, payment).await?;
    Ok(ApiResponse::success("Payment recorded", order, Some(Meta::empty())))
}

pub async fn ship_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = transition_order(state, user, id, Transition::Ship, None).await?;
    Ok(ApiResponse::success("Order shipped", order, Some(Meta::empty())))
}

pub async fn deliver_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = transition_order(state, user, id, Transition::Deliver, None).await?;
    Ok(ApiResponse::success("Order delivered", order, Some(Meta::empty())))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = transition_order(state, user, id, Transition::Cancel, None).await?;
    Ok(ApiResponse::success("Order cancelled", order, Some(Meta::empty())))
}

async fn transition_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    transition: Transition,
    payment: Option<PaymentResult>,
) -> AppResult<Order> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let next = Lifecycle::of(&order).apply(transition)?;
    let items = order.order_items.clone();
    let now = Utc::now();

    let mut active: OrderActive = order.into();
    active.status = Set(next.status);
    active.is_paid = Set(next.is_paid);
    active.is_delivered = Set(next.is_delivered);
    match transition {
        Transition::Pay => {
            active.paid_at = Set(Some(now.into()));
            active.payment_result = Set(payment);
        }
        Transition::Deliver => {
            active.delivered_at = Set(Some(now.into()));
        }
        Transition::Cancel => release_stock(&txn, &items.0).await?,
        Transition::Ship => {}
    }
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        transition = transition.as_str(),
        by = %user.user_id,
        "order status changed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "transition": transition.as_str() }),
    )
    .await;

    Ok(Order::from(order))
}

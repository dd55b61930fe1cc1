use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Address, Order, OrderItem, PaymentResult};

/// Raw order submission. Field names follow the storefront client (camelCase).
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderItemInput>,
    pub shipping_address: Option<String>,
    pub payment_method: Option<String>,
    #[schema(value_type = Option<String>, example = "40.00")]
    pub items_price: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "4.00")]
    pub tax_price: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "5.00")]
    pub shipping_price: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "49.00")]
    pub total_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product: Option<String>,
    pub quantity: Option<QuantityInput>,
    pub variant: Option<String>,
}

/// Quantities arrive as numbers or numeric strings from the storefront forms.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum QuantityInput {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl QuantityInput {
    /// Integer value of the input, or `None` when it does not parse as a number.
    /// Fractions are truncated toward zero.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            QuantityInput::Integer(n) => Some(*n),
            QuantityInput::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            QuantityInput::Float(_) => None,
            QuantityInput::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
            QuantityInput::Other(_) => None,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Payer {
    pub email_address: Option<String>,
}

/// Payment gateway callback payload accepted by the pay transition.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub id: Option<String>,
    pub status: Option<String>,
    pub update_time: Option<String>,
    pub payer: Option<Payer>,
}

impl From<PayOrderRequest> for PaymentResult {
    fn from(req: PayOrderRequest) -> Self {
        PaymentResult {
            id: req.id,
            status: req.status,
            update_time: req.update_time,
            email_address: req.payer.and_then(|p| p.email_address),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// A line item joined with the product's current display fields.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub user: Option<OrderUser>,
    pub shipping_address: Option<Address>,
    pub items: Vec<OrderItemView>,
}

//! Turns the raw item list of an order request into priced, validated line items.

use crate::{
    dto::orders::{OrderItemInput, QuantityInput},
    entity::orders::LineItem,
    error::{AppResult, OrderError, parse_id},
    services::{
        catalog::CatalogLookup,
        stock::{StockScope, validate_stock},
    },
};

/// A normalized line plus the display names needed for later stock errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledItem {
    pub line: LineItem,
    pub product_name: String,
    pub variant_label: Option<String>,
}

/// Validate every requested item in order and stop at the first failure.
/// Output order matches input order.
pub async fn assemble_order_items<L: CatalogLookup>(
    catalog: &L,
    items: &[OrderItemInput],
) -> AppResult<Vec<AssembledItem>> {
    if items.is_empty() {
        return Err(OrderError::NoOrderItems.into());
    }

    let mut assembled = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        assembled.push(assemble_item(catalog, index, item).await?);
    }
    Ok(assembled)
}

async fn assemble_item<L: CatalogLookup>(
    catalog: &L,
    index: usize,
    item: &OrderItemInput,
) -> AppResult<AssembledItem> {
    let raw_product =
        non_blank(item.product.as_deref()).ok_or(OrderError::MissingProduct { index })?;
    let product_id =
        parse_id(raw_product).ok_or_else(|| OrderError::product_not_found(raw_product))?;
    let product = catalog
        .find_product(product_id)
        .await?
        .ok_or_else(|| OrderError::product_not_found(product_id))?;

    let quantity = coerce_quantity(item.quantity.as_ref()).ok_or_else(|| {
        OrderError::InvalidQuantity {
            product: product.name.clone(),
        }
    })?;
    validate_stock(StockScope::Product(&product.name), product.stock, quantity)?;

    let (variant, variant_label) = match non_blank(item.variant.as_deref()) {
        None => (None, None),
        Some(raw_variant) => {
            let variant_id =
                parse_id(raw_variant).ok_or_else(|| OrderError::variant_not_found(raw_variant))?;
            let variant = catalog
                .find_variant(variant_id)
                .await?
                .filter(|v| v.product_id == product.id)
                .ok_or_else(|| OrderError::variant_not_found(variant_id))?;
            let label = variant.label(&product.name);
            validate_stock(StockScope::Variant(&label), variant.stock, quantity)?;
            (Some(variant.id), Some(label))
        }
    };

    Ok(AssembledItem {
        line: LineItem {
            product: product.id,
            quantity,
            variant,
            price: product.price,
        },
        product_name: product.name,
        variant_label,
    })
}

/// Missing or unparsable quantities count as 1; the result must be a positive `i32`.
pub fn coerce_quantity(input: Option<&QuantityInput>) -> Option<i32> {
    let raw = input.and_then(QuantityInput::as_integer).unwrap_or(1);
    if raw <= 0 {
        return None;
    }
    i32::try_from(raw).ok()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn line_items(items: Vec<AssembledItem>) -> Vec<LineItem> {
    items.into_iter().map(|item| item.line).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;
    use crate::{
        error::AppError,
        services::catalog::{ProductSnapshot, VariantSnapshot},
    };

    #[derive(Default)]
    struct MemoryCatalog {
        products: HashMap<Uuid, ProductSnapshot>,
        variants: HashMap<Uuid, VariantSnapshot>,
    }

    impl MemoryCatalog {
        fn product(&mut self, name: &str, price: Decimal, stock: i32) -> Uuid {
            let id = Uuid::new_v4();
            self.products.insert(
                id,
                ProductSnapshot { id, name: name.into(), price, stock },
            );
            id
        }

        fn variant(&mut self, product_id: Uuid, size: &str, color: &str, stock: i32) -> Uuid {
            let id = Uuid::new_v4();
            self.variants.insert(
                id,
                VariantSnapshot {
                    id,
                    product_id,
                    size: size.into(),
                    color: color.into(),
                    stock,
                },
            );
            id
        }
    }

    impl CatalogLookup for MemoryCatalog {
        async fn find_product(&self, id: Uuid) -> AppResult<Option<ProductSnapshot>> {
            Ok(self.products.get(&id).cloned())
        }

        async fn find_variant(&self, id: Uuid) -> AppResult<Option<VariantSnapshot>> {
            Ok(self.variants.get(&id).cloned())
        }
    }

    fn item(
        product: Option<Uuid>,
        quantity: Option<QuantityInput>,
        variant: Option<Uuid>,
    ) -> OrderItemInput {
        OrderItemInput {
            product: product.map(|id| id.to_string()),
            quantity,
            variant: variant.map(|id| id.to_string()),
        }
    }

    fn order_error(result: AppResult<Vec<AssembledItem>>) -> OrderError {
        match result {
            Err(AppError::Order(err)) => err,
            other => panic!("expected an order error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn snapshots_the_current_price() {
        let mut catalog = MemoryCatalog::default();
        let p1 = catalog.product("Ferris Mug", Decimal::new(2000, 2), 5);

        let items = assemble_order_items(
            &catalog,
            &[item(Some(p1), Some(QuantityInput::Integer(2)), None)],
        )
        .await
        .expect("assembled");

        assert_eq!(
            line_items(items),
            vec![LineItem {
                product: p1,
                quantity: 2,
                variant: None,
                price: Decimal::new(2000, 2),
            }]
        );
    }

    #[tokio::test]
    async fn empty_list_is_rejected() {
        let catalog = MemoryCatalog::default();
        let err = order_error(assemble_order_items(&catalog, &[]).await);
        assert_eq!(err, OrderError::NoOrderItems);
    }

    #[tokio::test]
    async fn blank_product_reference_is_missing() {
        let mut catalog = MemoryCatalog::default();
        let p1 = catalog.product("Mug", Decimal::ONE, 5);
        let blank = OrderItemInput {
            product: Some("  ".into()),
            ..Default::default()
        };

        let err = order_error(
            assemble_order_items(&catalog, &[item(Some(p1), None, None), blank]).await,
        );
        assert_eq!(err, OrderError::MissingProduct { index: 1 });
    }

    #[tokio::test]
    async fn unknown_or_malformed_products_are_not_found() {
        let catalog = MemoryCatalog::default();
        let unknown = item(Some(Uuid::new_v4()), None, None);
        let err = order_error(assemble_order_items(&catalog, &[unknown]).await);
        assert_eq!(err.code(), "ProductNotFound");

        let malformed = OrderItemInput {
            product: Some("P1".into()),
            ..Default::default()
        };
        let err = order_error(assemble_order_items(&catalog, &[malformed]).await);
        assert_eq!(err, OrderError::ProductNotFound("P1".into()));
    }

    #[tokio::test]
    async fn quantity_defaults_to_one_and_rejects_non_positive() {
        let mut catalog = MemoryCatalog::default();
        let p1 = catalog.product("Mug", Decimal::ONE, 5);

        let items = assemble_order_items(
            &catalog,
            &[
                item(Some(p1), None, None),
                item(Some(p1), Some(QuantityInput::Text("abc".into())), None),
                item(Some(p1), Some(QuantityInput::Text(" 3 ".into())), None),
                item(Some(p1), Some(QuantityInput::Float(2.9)), None),
            ],
        )
        .await
        .expect("assembled");
        let quantities: Vec<i32> = items.iter().map(|i| i.line.quantity).collect();
        assert_eq!(quantities, vec![1, 1, 3, 2]);

        let err = order_error(
            assemble_order_items(
                &catalog,
                &[item(Some(p1), Some(QuantityInput::Integer(0)), None)],
            )
            .await,
        );
        assert_eq!(err, OrderError::InvalidQuantity { product: "Mug".into() });
    }

    #[tokio::test]
    async fn one_short_item_rejects_the_whole_order() {
        let mut catalog = MemoryCatalog::default();
        let plenty = catalog.product("Sticker Pack", Decimal::ONE, 100);
        let scarce = catalog.product("Ferris Mug", Decimal::TEN, 1);

        let err = order_error(
            assemble_order_items(
                &catalog,
                &[
                    item(Some(plenty), Some(QuantityInput::Integer(3)), None),
                    item(Some(scarce), Some(QuantityInput::Integer(2)), None),
                ],
            )
            .await,
        );
        assert_eq!(err, OrderError::InsufficientStock { name: "Ferris Mug".into() });
    }

    #[tokio::test]
    async fn variant_stock_is_checked_separately() {
        let mut catalog = MemoryCatalog::default();
        let hoodie = catalog.product("Axum Hoodie", Decimal::new(5500, 2), 50);
        let medium = catalog.variant(hoodie, "M", "black", 1);

        let ok = assemble_order_items(
            &catalog,
            &[item(Some(hoodie), Some(QuantityInput::Integer(1)), Some(medium))],
        )
        .await
        .expect("assembled");
        assert_eq!(ok[0].line.variant, Some(medium));
        assert_eq!(ok[0].variant_label.as_deref(), Some("Axum Hoodie (M / black)"));

        let err = order_error(
            assemble_order_items(
                &catalog,
                &[item(Some(hoodie), Some(QuantityInput::Integer(2)), Some(medium))],
            )
            .await,
        );
        assert_eq!(
            err,
            OrderError::InsufficientVariantStock { name: "Axum Hoodie (M / black)".into() }
        );
    }

    #[tokio::test]
    async fn variant_of_another_product_is_not_found() {
        let mut catalog = MemoryCatalog::default();
        let hoodie = catalog.product("Axum Hoodie", Decimal::ONE, 5);
        let mug = catalog.product("Ferris Mug", Decimal::ONE, 5);
        let mug_variant = catalog.variant(mug, "L", "white", 5);

        let err = order_error(
            assemble_order_items(&catalog, &[item(Some(hoodie), None, Some(mug_variant))]).await,
        );
        assert_eq!(err, OrderError::variant_not_found(mug_variant));
    }

    #[tokio::test]
    async fn blank_variant_is_treated_as_absent() {
        let mut catalog = MemoryCatalog::default();
        let p1 = catalog.product("Mug", Decimal::ONE, 5);
        let input = OrderItemInput {
            product: Some(p1.to_string()),
            quantity: None,
            variant: Some(String::new()),
        };

        let items = assemble_order_items(&catalog, &[input]).await.expect("assembled");
        assert_eq!(items[0].line.variant, None);
    }

    #[test]
    fn oversized_quantities_are_invalid() {
        let too_big = QuantityInput::Integer(i64::from(i32::MAX) + 1);
        assert_eq!(coerce_quantity(Some(&too_big)), None);
        assert_eq!(coerce_quantity(Some(&QuantityInput::Integer(-4))), None);
        let odd = QuantityInput::Other(serde_json::Value::Bool(true));
        assert_eq!(coerce_quantity(Some(&odd)), Some(1));
    }
}

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::{
    entity::{
        Products, Variants,
        orders::LineItem,
        products::Column as ProdCol,
        variants::Column as VariantCol,
    },
    error::{AppResult, OrderError},
    services::order_assembler::AssembledItem,
};

/// Which stock pool a check runs against, with its display name.
#[derive(Debug, Clone, Copy)]
pub enum StockScope<'a> {
    Product(&'a str),
    Variant(&'a str),
}

/// Point-in-time availability check. Nothing is held between this check and
/// the order write; [`reserve_stock`] is the authoritative guard.
pub fn validate_stock(
    scope: StockScope<'_>,
    available: i32,
    requested: i32,
) -> Result<(), OrderError> {
    if available >= requested {
        return Ok(());
    }
    Err(match scope {
        StockScope::Product(name) => OrderError::InsufficientStock {
            name: name.to_string(),
        },
        StockScope::Variant(name) => OrderError::InsufficientVariantStock {
            name: name.to_string(),
        },
    })
}

/// Decrement product and variant stock for every item, each as a single
/// `UPDATE ... WHERE stock >= qty`. Run inside the order transaction so a
/// failure on any item rolls back the earlier decrements.
pub async fn reserve_stock<C: ConnectionTrait>(conn: &C, items: &[AssembledItem]) -> AppResult<()> {
    for item in items {
        let quantity = item.line.quantity;

        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
            .filter(ProdCol::Id.eq(item.line.product))
            .filter(ProdCol::Stock.gte(quantity))
            .exec(conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(OrderError::InsufficientStock {
                name: item.product_name.clone(),
            }
            .into());
        }

        if let Some(variant_id) = item.line.variant {
            let result = Variants::update_many()
                .col_expr(VariantCol::Stock, Expr::col(VariantCol::Stock).sub(quantity))
                .filter(VariantCol::Id.eq(variant_id))
                .filter(VariantCol::Stock.gte(quantity))
                .exec(conn)
                .await?;
            if result.rows_affected == 0 {
                let name = item
                    .variant_label
                    .clone()
                    .unwrap_or_else(|| item.product_name.clone());
                return Err(OrderError::InsufficientVariantStock { name }.into());
            }
        }
    }
    Ok(())
}

/// Give reserved stock back. Products or variants deleted since the order was
/// placed are skipped.
pub async fn release_stock<C: ConnectionTrait>(conn: &C, items: &[LineItem]) -> AppResult<()> {
    for item in items {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .filter(ProdCol::Id.eq(item.product))
            .exec(conn)
            .await?;

        if let Some(variant_id) = item.variant {
            Variants::update_many()
                .col_expr(VariantCol::Stock, Expr::col(VariantCol::Stock).add(item.quantity))
                .filter(VariantCol::Id.eq(variant_id))
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_stock_is_enough() {
        assert!(validate_stock(StockScope::Product("Mug"), 2, 2).is_ok());
        assert!(validate_stock(StockScope::Product("Mug"), 5, 2).is_ok());
    }

    #[test]
    fn shortfall_names_the_product() {
        let err = validate_stock(StockScope::Product("Ferris Mug"), 1, 2).unwrap_err();
        assert_eq!(err, OrderError::InsufficientStock { name: "Ferris Mug".into() });
    }

    #[test]
    fn variant_shortfall_is_its_own_kind() {
        let err = validate_stock(StockScope::Variant("Hoodie (M / black)"), 0, 1).unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientVariantStock { name: "Hoodie (M / black)".into() }
        );
    }
}

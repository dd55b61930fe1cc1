//! Read-only product and variant lookups used while assembling an order.

use std::future::Future;

use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::{
    entity::{Products, Variants, products, variants},
    error::AppResult,
};

/// Current price and stock of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSnapshot {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size: String,
    pub color: String,
    pub stock: i32,
}

impl VariantSnapshot {
    /// Display name used in stock errors, e.g. `Axum Hoodie (M / black)`.
    pub fn label(&self, product_name: &str) -> String {
        format!("{product_name} ({} / {})", self.size, self.color)
    }
}

impl From<products::Model> for ProductSnapshot {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            stock: model.stock,
        }
    }
}

impl From<variants::Model> for VariantSnapshot {
    fn from(model: variants::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            size: model.size,
            color: model.color,
            stock: model.stock,
        }
    }
}

pub trait CatalogLookup: Sync {
    fn find_product(
        &self,
        id: Uuid,
    ) -> impl Future<Output = AppResult<Option<ProductSnapshot>>> + Send;

    fn find_variant(
        &self,
        id: Uuid,
    ) -> impl Future<Output = AppResult<Option<VariantSnapshot>>> + Send;
}

/// Catalog backed by the database. Works on the pool or inside an open transaction.
pub struct OrmCatalog<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> OrmCatalog<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

impl<C: ConnectionTrait> CatalogLookup for OrmCatalog<'_, C> {
    async fn find_product(&self, id: Uuid) -> AppResult<Option<ProductSnapshot>> {
        let product = Products::find_by_id(id).one(self.conn).await?;
        Ok(product.map(ProductSnapshot::from))
    }

    async fn find_variant(&self, id: Uuid) -> AppResult<Option<VariantSnapshot>> {
        let variant = Variants::find_by_id(id).one(self.conn).await?;
        Ok(variant.map(VariantSnapshot::from))
    }
}

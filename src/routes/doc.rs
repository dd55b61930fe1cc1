use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::{AddressList, CreateAddressRequest},
        categories::{CategoryList, CreateCategoryRequest},
        orders::{
            CreateOrderRequest, OrderDetail, OrderItemInput, OrderItemView, OrderList, OrderUser,
            PayOrderRequest, Payer, QuantityInput,
        },
        products::{
            CreateProductRequest, CreateVariantRequest, InventoryAdjustRequest, ProductList,
            UpdateProductRequest, UpdateVariantRequest, VariantList,
        },
    },
    models::{
        Address, Category, Order, OrderItem, OrderStatus, PaymentResult, Product, User, Variant,
    },
    response::{ApiResponse, Meta},
    routes::{addresses, admin, categories, health, orders, params, products, variants},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        categories::list_categories,
        categories::create_category,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::list_variants,
        products::create_variant,
        variants::update_variant,
        variants::delete_variant,
        addresses::list_addresses,
        addresses::create_address,
        addresses::delete_address,
        orders::create_order,
        orders::list_my_orders,
        orders::get_order,
        orders::pay_order,
        orders::ship_order,
        orders::deliver_order,
        orders::cancel_order,
        admin::list_all_orders,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            Variant,
            Address,
            Order,
            OrderItem,
            OrderStatus,
            PaymentResult,
            CreateOrderRequest,
            OrderItemInput,
            QuantityInput,
            PayOrderRequest,
            Payer,
            OrderList,
            OrderDetail,
            OrderItemView,
            OrderUser,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateVariantRequest,
            UpdateVariantRequest,
            VariantList,
            CreateCategoryRequest,
            CategoryList,
            CreateAddressRequest,
            AddressList,
            InventoryAdjustRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderDetail>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Variant>,
            ApiResponse<VariantList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Product and variant endpoints"),
        (name = "Addresses", description = "Shipping address endpoints"),
        (name = "Orders", description = "Order placement and status endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

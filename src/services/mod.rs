pub mod address_service;
pub mod admin_service;
pub mod catalog;
pub mod category_service;
pub mod order_assembler;
pub mod order_lifecycle;
pub mod order_service;
pub mod product_service;
pub mod stock;
pub mod variant_service;

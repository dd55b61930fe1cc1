pub mod addresses;
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;
pub mod variants;

pub use addresses::Entity as Addresses;
pub use categories::Entity as Categories;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use users::Entity as Users;
pub use variants::Entity as Variants;

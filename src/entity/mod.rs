pub mod order_items;
pub mod order_supplements;
pub mod orders;
pub mod payments;
pub mod product_supplements;
pub mod products;
pub mod stock_movements;
pub mod stocks;
pub mod users;

pub use order_items::Entity as OrderItems;
pub use order_supplements::Entity as OrderSupplements;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use product_supplements::Entity as ProductSupplements;
pub use products::Entity as Products;
pub use stock_movements::Entity as StockMovements;
pub use stocks::Entity as Stocks;
pub use users::Entity as Users;

pub mod carts;
pub mod dashboard;
pub mod orders;
pub mod payments;
pub mod products;

pub use carts::CartService;
pub use dashboard::DashboardService;
pub use orders::OrderService;
pub use payments::PaymentQueryService;
pub use products::ProductCatalogService;

pub mod cart_items;
pub mod carts;
pub mod checkout_payload;
pub mod common;
pub mod dashboard;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::orders::ProofPolicy;
use crate::storage::ProofStore;
use std::sync::Arc;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<crate::services::OrderService>,
    pub carts: Arc<crate::services::CartService>,
    pub payments: Arc<crate::services::PaymentQueryService>,
    pub products: Arc<crate::services::ProductCatalogService>,
    pub dashboard: Arc<crate::services::DashboardService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        proof_store: Arc<dyn ProofStore>,
        proof_policy: ProofPolicy,
    ) -> Self {
        let orders = Arc::new(crate::services::OrderService::new(
            db_pool.clone(),
            event_sender.clone(),
            proof_store,
            proof_policy,
        ));
        let carts = Arc::new(crate::services::CartService::new(
            db_pool.clone(),
            event_sender,
        ));
        let payments = Arc::new(crate::services::PaymentQueryService::new(db_pool.clone()));
        let products = Arc::new(crate::services::ProductCatalogService::new(db_pool.clone()));
        let dashboard = Arc::new(crate::services::DashboardService::new(db_pool));

        Self {
            orders,
            carts,
            payments,
            products,
            dashboard,
        }
    }
}

use crate::{
    auth::UserContext,
    entities::{cart, cart_item, order, Cart, CartItem, Order, OrderItem, OrderItemModel, OrderModel},
    errors::ServiceError,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Per-user dashboard figures: cart item count, order count, and the user's
/// orders with their lines.
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(user_id = %user.user_id))]
    pub async fn summary(&self, user: &UserContext) -> Result<DashboardSummary, ServiceError> {
        let cart_ids: Vec<_> = Cart::find()
            .filter(cart::Column::UserId.eq(user.user_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let cart_item_count = if cart_ids.is_empty() {
            0
        } else {
            CartItem::find()
                .filter(cart_item::Column::CartId.is_in(cart_ids))
                .count(&*self.db)
                .await?
        };

        let orders = Order::find()
            .filter(order::Column::UserId.eq(user.user_id))
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItem)
            .all(&*self.db)
            .await?;

        let order_count = orders.len() as u64;
        let orders = orders
            .into_iter()
            .map(|(order, items)| OrderWithItems { order, items })
            .collect();

        Ok(DashboardSummary {
            cart_item_count,
            order_count,
            orders,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub cart_item_count: u64,
    pub order_count: u64,
    pub orders: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

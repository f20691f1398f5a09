use crate::{
    auth::UserContext,
    entities::{payment, Order, OrderItem, OrderItemModel, OrderModel, Payment, PaymentModel},
    errors::ServiceError,
};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

const MAX_PER_PAGE: u64 = 100;

/// Read-side service over recorded payments, for the admin back office.
/// Searches run over the bank snapshot columns stored on the payment itself,
/// so results reflect what the customer was shown at checkout time.
#[derive(Clone)]
pub struct PaymentQueryService {
    db: Arc<DatabaseConnection>,
}

impl PaymentQueryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Paginated payment listing with optional search. Admin only.
    #[instrument(skip(self), fields(user_id = %user.user_id))]
    pub async fn list(
        &self,
        user: &UserContext,
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<PaymentModel>, u64), ServiceError> {
        require_admin(user)?;

        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let mut query = Payment::find().order_by_desc(payment::Column::CreatedAt);

        if let Some(needle) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(payment::Column::BankName.contains(needle))
                    .add(payment::Column::BankAccountNumber.contains(needle))
                    .add(payment::Column::BankAccountHolder.contains(needle)),
            );
        }

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((data, total))
    }

    /// Payment detail with its parent order and the order's lines. Admin only.
    #[instrument(skip(self), fields(user_id = %user.user_id))]
    pub async fn get(&self, user: &UserContext, payment_id: Uuid) -> Result<PaymentDetail, ServiceError> {
        require_admin(user)?;

        let payment = Payment::find_by_id(payment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))?;

        let order = payment
            .find_related(Order)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Payment {} has no parent order",
                    payment_id
                ))
            })?;

        let items = order.find_related(OrderItem).all(&*self.db).await?;

        Ok(PaymentDetail {
            payment,
            order,
            items,
        })
    }
}

fn require_admin(user: &UserContext) -> Result<(), ServiceError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "This resource requires the admin role".to_string(),
        ))
    }
}

/// A payment joined with its order aggregate
#[derive(Debug, Serialize)]
pub struct PaymentDetail {
    pub payment: PaymentModel,
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

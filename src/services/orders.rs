use crate::{
    auth::UserContext,
    entities::{
        order, order_item, payment, Bank, Cart, OrderStatus, PaymentStatus, Product,
    },
    errors::{FieldErrors, ServiceError},
    events::{Event, EventSender},
    storage::ProofStore,
};
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Logical folder for uploaded payment proofs inside the storage root.
pub const PROOF_FOLDER: &str = "proofs";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// One line of a checkout request. Product fields are snapshotted verbatim
/// into the order item; only the product's existence is checked.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub variant_option: Option<String>,
    pub price: i64,
    pub qty: i32,
}

/// An uploaded proof-of-payment document.
#[derive(Debug, Clone)]
pub struct ProofUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Fully decoded checkout request, produced by the request boundary before
/// any validation or persistence runs.
#[derive(Debug)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub total_qty: i32,
    pub total_price: i64,
    pub bank_id: Uuid,
    pub payment_date: NaiveDate,
    pub cart_id: Option<Uuid>,
    pub proof: Option<ProofUpload>,
}

/// Success payload: the new order's identity and a human-readable message.
/// No order detail is echoed back.
#[derive(Debug, Serialize)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub message: String,
}

/// Accepted size bounds and type constraints for proof uploads.
#[derive(Debug, Clone, Copy)]
pub struct ProofPolicy {
    pub min_bytes: usize,
    pub max_bytes: usize,
}

impl ProofPolicy {
    /// Returns the violation message for an upload that breaks the policy.
    pub fn violation(&self, proof: &ProofUpload) -> Option<String> {
        let is_pdf = proof
            .content_type
            .as_deref()
            .map(|ct| ct == "application/pdf")
            .unwrap_or(false)
            && proof.bytes.starts_with(PDF_MAGIC);
        if !is_pdf {
            return Some("The proof must be a PDF document".to_string());
        }
        if proof.bytes.len() < self.min_bytes {
            return Some(format!(
                "The proof must be at least {} kilobytes",
                self.min_bytes / 1024
            ));
        }
        if proof.bytes.len() > self.max_bytes {
            return Some(format!(
                "The proof may not be greater than {} kilobytes",
                self.max_bytes / 1024
            ));
        }
        None
    }
}

/// Order submission service: validates a checkout request, then atomically
/// creates the Order / OrderItem / Payment aggregate, persists the optional
/// proof file and removes the originating cart.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    proof_store: Arc<dyn ProofStore>,
    proof_policy: ProofPolicy,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        proof_store: Arc<dyn ProofStore>,
        proof_policy: ProofPolicy,
    ) -> Self {
        Self {
            db,
            event_sender,
            proof_store,
            proof_policy,
        }
    }

    /// Submits a checkout request for the acting user.
    ///
    /// Validation runs entirely before the transaction opens; a validation
    /// failure therefore has no effects to roll back. Afterwards, in order:
    /// insert the order, insert one order item per request line, persist the
    /// proof file (when present), re-resolve the bank and insert the payment
    /// with its snapshot, delete the source cart (when referenced), commit.
    /// Any failure in that chain rolls the whole transaction back; no partial
    /// aggregate is ever visible.
    #[instrument(skip(self, request), fields(user_id = %user.user_id))]
    pub async fn submit_order(
        &self,
        user: &UserContext,
        request: CheckoutRequest,
    ) -> Result<OrderConfirmation, ServiceError> {
        self.validate(&request).await?;

        let computed_qty: i64 = request.items.iter().map(|i| i.qty as i64).sum();
        let computed_price: i64 = request.items.iter().map(|i| i.price * i.qty as i64).sum();
        if computed_qty != request.total_qty as i64 || computed_price != request.total_price {
            // Client-supplied totals are recorded as-is; the discrepancy is
            // only surfaced in the logs.
            warn!(
                total_qty = request.total_qty,
                total_price = request.total_price,
                computed_qty,
                computed_price,
                "checkout totals disagree with item lines"
            );
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();

        let order_id = Uuid::new_v4();
        let new_order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user.user_id),
            total_price: Set(request.total_price),
            total_qty: Set(request.total_qty),
            status: Set(OrderStatus::Paid),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created_order = new_order.insert(&txn).await?;

        for item in &request.items {
            let order_item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name.clone()),
                variant_name: Set(item.variant_name.clone()),
                variant_option: Set(item.variant_option.clone()),
                price: Set(item.price),
                qty: Set(item.qty),
                created_at: Set(now),
                updated_at: Set(now),
            };
            order_item.insert(&txn).await?;
        }

        // The file write is not covered by the transaction; doing it before
        // the payment insert means a storage failure aborts the request and
        // no payment row can reference a missing file.
        let proof_path = match &request.proof {
            Some(upload) => Some(
                self.proof_store
                    .store(PROOF_FOLDER, "pdf", &upload.bytes)
                    .await?,
            ),
            None => None,
        };

        // Re-resolve the bank inside the transaction for a consistent
        // snapshot; it may have been removed since input validation.
        let bank = Bank::find_by_id(request.bank_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Bank {} not found", request.bank_id))
            })?;

        let payment_id = Uuid::new_v4();
        let new_payment = payment::ActiveModel {
            id: Set(payment_id),
            order_id: Set(order_id),
            bank_id: Set(bank.id),
            bank_name: Set(bank.name.clone()),
            bank_account_number: Set(bank.account_number.clone()),
            bank_account_holder: Set(bank.account_holder.clone()),
            amount: Set(request.total_price),
            status: Set(PaymentStatus::Pending),
            payment_date: Set(request.payment_date),
            proof: Set(proof_path),
            created_at: Set(now),
            updated_at: Set(now),
        };
        new_payment.insert(&txn).await?;

        if let Some(cart_id) = request.cart_id {
            Cart::delete_by_id(cart_id).exec(&txn).await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderSubmitted {
                order_id,
                user_id: user.user_id,
            })
            .await;
        self.event_sender
            .send_or_log(Event::PaymentRecorded {
                payment_id,
                order_id,
            })
            .await;
        if let Some(cart_id) = request.cart_id {
            self.event_sender
                .send_or_log(Event::CartDeleted(cart_id))
                .await;
        }

        info!(%order_id, items = request.items.len(), "order created");
        Ok(OrderConfirmation {
            order_id: created_order.id,
            message: "Order created successfully".to_string(),
        })
    }

    /// Validates the request against its contract and referential integrity.
    /// Rejects the whole request with a field -> message map on any failure;
    /// nothing is written.
    async fn validate(&self, request: &CheckoutRequest) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new();

        if request.items.is_empty() {
            errors.insert("items".into(), "At least one item is required".into());
        }
        for (i, item) in request.items.iter().enumerate() {
            if item.product_name.trim().is_empty() {
                errors.insert(
                    format!("items.{}.product_name", i),
                    "The product name is required".into(),
                );
            }
            if item.qty < 1 {
                errors.insert(
                    format!("items.{}.qty", i),
                    "The quantity must be at least 1".into(),
                );
            }
        }
        if request.total_qty < 1 {
            errors.insert("total_qty".into(), "The total quantity must be at least 1".into());
        }
        if request.total_price < 1 {
            errors.insert("total_price".into(), "The total price must be at least 1".into());
        }

        if let Some(proof) = &request.proof {
            if let Some(message) = self.proof_policy.violation(proof) {
                errors.insert("proof".into(), message);
            }
        }

        // Referential checks run against the pool, before any transaction.
        let wanted: HashSet<Uuid> = request.items.iter().map(|i| i.product_id).collect();
        if !wanted.is_empty() {
            let found: HashSet<Uuid> = Product::find()
                .filter(
                    crate::entities::product::Column::Id
                        .is_in(wanted.iter().copied().collect::<Vec<_>>()),
                )
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|p| p.id)
                .collect();
            for (i, item) in request.items.iter().enumerate() {
                if !found.contains(&item.product_id) {
                    errors.insert(
                        format!("items.{}.product_id", i),
                        "The selected product does not exist".into(),
                    );
                }
            }
        }

        if Bank::find_by_id(request.bank_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            errors.insert("bank_id".into(), "The selected bank does not exist".into());
        }

        if let Some(cart_id) = request.cart_id {
            if Cart::find_by_id(cart_id).one(&*self.db).await?.is_none() {
                errors.insert("cart_id".into(), "The selected cart does not exist".into());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(errors))
        }
    }
}

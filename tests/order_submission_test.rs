//! Integration tests for the order submission flow.
//!
//! Covers the full aggregate write (order + items + payment), validation of
//! referential fields, proof upload constraints, atomic rollback on storage
//! failure, cart cleanup, and the HTTP surface.

mod common;

use assert_matches::assert_matches;
use bytes::Bytes;
use chrono::NaiveDate;
use common::{TestApp, TEST_PROOF_MIN};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, PaginatorTrait};
use std::sync::Arc;
use storefront_api::{
    entities::{bank, Bank, Cart, CartItem, Order, OrderItem, OrderStatus, Payment, PaymentStatus},
    errors::ServiceError,
    services::orders::{CheckoutItem, CheckoutRequest, ProofUpload},
    storage::ProofStore,
};
use tempfile::TempDir;
use uuid::Uuid;

fn payment_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
}

fn single_item_request(product_id: Uuid, bank_id: Uuid) -> CheckoutRequest {
    CheckoutRequest {
        items: vec![CheckoutItem {
            product_id,
            product_name: "Mechanical Keyboard".into(),
            variant_name: None,
            variant_option: None,
            price: 1000,
            qty: 2,
        }],
        total_qty: 2,
        total_price: 2000,
        bank_id,
        payment_date: payment_date(),
        cart_id: None,
        proof: None,
    }
}

fn valid_pdf(len: usize) -> ProofUpload {
    let mut bytes = Vec::from(&b"%PDF-1.4\n"[..]);
    bytes.resize(len, b'0');
    ProofUpload {
        filename: Some("proof.pdf".into()),
        content_type: Some("application/pdf".into()),
        bytes: Bytes::from(bytes),
    }
}

async fn aggregate_counts(db: &sea_orm::DatabaseConnection) -> (u64, u64, u64) {
    let orders = Order::find().count(db).await.unwrap();
    let items = OrderItem::find().count(db).await.unwrap();
    let payments = Payment::find().count(db).await.unwrap();
    (orders, items, payments)
}

// ==================== Successful submission ====================

#[tokio::test]
async fn scenario_a_creates_the_full_aggregate() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Mechanical Keyboard", 1000, true).await;
    let bank = app.seed_bank(&user, "First National").await;

    let confirmation = app
        .state
        .services
        .orders
        .submit_order(&user, single_item_request(product.id, bank.id))
        .await
        .expect("submission should succeed");

    let order = Order::find_by_id(confirmation.order_id)
        .one(app.db())
        .await
        .unwrap()
        .expect("order row");
    assert_eq!(order.user_id, user.user_id);
    assert_eq!(order.total_price, 2000);
    assert_eq!(order.total_qty, 2);
    assert_eq!(order.status, OrderStatus::Paid);

    let items = OrderItem::find().all(app.db()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].order_id, order.id);
    assert_eq!(items[0].product_id, product.id);
    assert_eq!(items[0].price, 1000);
    assert_eq!(items[0].qty, 2);

    let payments = Payment::find().all(app.db()).await.unwrap();
    assert_eq!(payments.len(), 1);
    let payment = &payments[0];
    assert_eq!(payment.order_id, order.id);
    assert_eq!(payment.amount, 2000);
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.payment_date, payment_date());
    assert_eq!(payment.proof, None);
    // Bank snapshot copied at write time
    assert_eq!(payment.bank_id, bank.id);
    assert_eq!(payment.bank_name, bank.name);
    assert_eq!(payment.bank_account_number, bank.account_number);
    assert_eq!(payment.bank_account_holder, bank.account_holder);
}

#[tokio::test]
async fn aggregate_has_one_item_row_per_request_line() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let p1 = app.seed_product("Keyboard", 1000, true).await;
    let p2 = app.seed_product("Mouse", 500, true).await;
    let bank = app.seed_bank(&user, "First National").await;

    let request = CheckoutRequest {
        items: vec![
            CheckoutItem {
                product_id: p1.id,
                product_name: p1.name.clone(),
                variant_name: Some("Switch".into()),
                variant_option: Some("Brown".into()),
                price: 1000,
                qty: 1,
            },
            CheckoutItem {
                product_id: p2.id,
                product_name: p2.name.clone(),
                variant_name: None,
                variant_option: None,
                price: 500,
                qty: 3,
            },
        ],
        total_qty: 4,
        total_price: 2500,
        bank_id: bank.id,
        payment_date: payment_date(),
        cart_id: None,
        proof: None,
    };

    app.state
        .services
        .orders
        .submit_order(&user, request)
        .await
        .unwrap();

    let (orders, items, payments) = aggregate_counts(app.db()).await;
    assert_eq!((orders, items, payments), (1, 2, 1));

    let items = OrderItem::find().all(app.db()).await.unwrap();
    let keyboard = items.iter().find(|i| i.product_id == p1.id).unwrap();
    assert_eq!(keyboard.variant_name.as_deref(), Some("Switch"));
    assert_eq!(keyboard.variant_option.as_deref(), Some("Brown"));
}

#[tokio::test]
async fn proof_is_stored_and_referenced_by_the_payment() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Keyboard", 1000, true).await;
    let bank = app.seed_bank(&user, "First National").await;

    let mut request = single_item_request(product.id, bank.id);
    request.proof = Some(valid_pdf(2 * TEST_PROOF_MIN));

    app.state
        .services
        .orders
        .submit_order(&user, request)
        .await
        .unwrap();

    let payment = Payment::find().one(app.db()).await.unwrap().unwrap();
    let proof_path = payment.proof.expect("proof path recorded");
    assert!(proof_path.starts_with("proofs/"));

    let stored = std::fs::read(app.upload_dir.path().join(&proof_path)).unwrap();
    assert!(stored.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn totals_are_recorded_as_submitted_without_recomputation() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Keyboard", 1000, true).await;
    let bank = app.seed_bank(&user, "First National").await;

    // Lines sum to 2000 but the client claims 9999; the recorded totals are
    // the client's, by design.
    let mut request = single_item_request(product.id, bank.id);
    request.total_price = 9999;
    request.total_qty = 7;

    let confirmation = app
        .state
        .services
        .orders
        .submit_order(&user, request)
        .await
        .unwrap();

    let order = Order::find_by_id(confirmation.order_id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.total_price, 9999);
    assert_eq!(order.total_qty, 7);

    let payment = Payment::find().one(app.db()).await.unwrap().unwrap();
    assert_eq!(payment.amount, 9999);
}

// ==================== Validation ====================

#[tokio::test]
async fn scenario_b_unknown_bank_fails_validation_with_zero_rows() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Keyboard", 1000, true).await;

    let err = app
        .state
        .services
        .orders
        .submit_order(&user, single_item_request(product.id, Uuid::new_v4()))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Validation(ref fields) if fields.contains_key("bank_id"));
    assert_eq!(aggregate_counts(app.db()).await, (0, 0, 0));
}

#[tokio::test]
async fn unknown_product_fails_validation_with_zero_rows() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let bank = app.seed_bank(&user, "First National").await;

    let err = app
        .state
        .services
        .orders
        .submit_order(&user, single_item_request(Uuid::new_v4(), bank.id))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::Validation(ref fields) if fields.contains_key("items.0.product_id")
    );
    assert_eq!(aggregate_counts(app.db()).await, (0, 0, 0));
}

#[tokio::test]
async fn unknown_cart_fails_validation() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Keyboard", 1000, true).await;
    let bank = app.seed_bank(&user, "First National").await;

    let mut request = single_item_request(product.id, bank.id);
    request.cart_id = Some(Uuid::new_v4());

    let err = app
        .state
        .services
        .orders
        .submit_order(&user, request)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Validation(ref fields) if fields.contains_key("cart_id"));
    assert_eq!(aggregate_counts(app.db()).await, (0, 0, 0));
}

#[tokio::test]
async fn empty_items_and_bad_totals_are_reported_together() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let bank = app.seed_bank(&user, "First National").await;

    let request = CheckoutRequest {
        items: vec![],
        total_qty: 0,
        total_price: 0,
        bank_id: bank.id,
        payment_date: payment_date(),
        cart_id: None,
        proof: None,
    };

    let err = app
        .state
        .services
        .orders
        .submit_order(&user, request)
        .await
        .unwrap_err();

    match err {
        ServiceError::Validation(fields) => {
            assert!(fields.contains_key("items"));
            assert!(fields.contains_key("total_qty"));
            assert!(fields.contains_key("total_price"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

// ==================== Proof constraints ====================

#[tokio::test]
async fn undersized_oversized_and_non_pdf_proofs_are_rejected_before_any_write() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Keyboard", 1000, true).await;
    let bank = app.seed_bank(&user, "First National").await;

    let too_small = valid_pdf(TEST_PROOF_MIN / 2);
    let too_big = valid_pdf(common::TEST_PROOF_MAX * 2);
    let wrong_type = ProofUpload {
        filename: Some("proof.png".into()),
        content_type: Some("image/png".into()),
        bytes: Bytes::from(vec![0u8; 2 * TEST_PROOF_MIN]),
    };

    for proof in [too_small, too_big, wrong_type] {
        let mut request = single_item_request(product.id, bank.id);
        request.proof = Some(proof);

        let err = app
            .state
            .services
            .orders
            .submit_order(&user, request)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Validation(ref fields) if fields.contains_key("proof"));
    }

    assert_eq!(aggregate_counts(app.db()).await, (0, 0, 0));
    // Nothing may be left on disk either.
    assert!(!app.upload_dir.path().join("proofs").exists());
}

// ==================== Cart cleanup ====================

#[tokio::test]
async fn scenario_c_referenced_cart_is_deleted_on_success() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Keyboard", 1000, true).await;
    let bank = app.seed_bank(&user, "First National").await;
    let cart = app.seed_cart(&user, "weekly shop").await;
    app.seed_cart_item(&cart, &product, 2).await;

    let mut request = single_item_request(product.id, bank.id);
    request.cart_id = Some(cart.id);

    app.state
        .services
        .orders
        .submit_order(&user, request)
        .await
        .unwrap();

    assert!(Cart::find_by_id(cart.id)
        .one(app.db())
        .await
        .unwrap()
        .is_none());
    assert_eq!(CartItem::find().count(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn unreferenced_cart_is_left_alone() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Keyboard", 1000, true).await;
    let bank = app.seed_bank(&user, "First National").await;
    let cart = app.seed_cart(&user, "weekly shop").await;

    app.state
        .services
        .orders
        .submit_order(&user, single_item_request(product.id, bank.id))
        .await
        .unwrap();

    assert!(Cart::find_by_id(cart.id)
        .one(app.db())
        .await
        .unwrap()
        .is_some());
}

// ==================== Atomicity ====================

struct FailingProofStore;

#[async_trait::async_trait]
impl ProofStore for FailingProofStore {
    async fn store(
        &self,
        _folder: &str,
        _extension: &str,
        _bytes: &[u8],
    ) -> Result<String, ServiceError> {
        Err(ServiceError::StorageError("simulated disk failure".into()))
    }
}

#[tokio::test]
async fn scenario_d_failure_after_partial_inserts_rolls_everything_back() {
    // The storage fault fires after the order and its items are already
    // inserted in the open transaction; everything must unwind.
    let upload_dir = TempDir::new().unwrap();
    let app = TestApp::with_proof_store(upload_dir, Arc::new(FailingProofStore)).await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Keyboard", 1000, true).await;
    let bank = app.seed_bank(&user, "First National").await;
    let cart = app.seed_cart(&user, "weekly shop").await;
    app.seed_cart_item(&cart, &product, 2).await;

    let mut request = single_item_request(product.id, bank.id);
    request.cart_id = Some(cart.id);
    request.proof = Some(valid_pdf(2 * TEST_PROOF_MIN));

    let err = app
        .state
        .services
        .orders
        .submit_order(&user, request)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::StorageError(_));

    assert_eq!(aggregate_counts(app.db()).await, (0, 0, 0));
    // The referenced cart survives the rollback.
    assert!(Cart::find_by_id(cart.id)
        .one(app.db())
        .await
        .unwrap()
        .is_some());
    assert_eq!(CartItem::find().count(app.db()).await.unwrap(), 1);
}

// ==================== Snapshot immutability ====================

#[tokio::test]
async fn later_bank_edits_do_not_change_recorded_payments() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let product = app.seed_product("Keyboard", 1000, true).await;
    let seeded_bank = app.seed_bank(&user, "First National").await;

    app.state
        .services
        .orders
        .submit_order(&user, single_item_request(product.id, seeded_bank.id))
        .await
        .unwrap();

    // Mutate the source bank after the fact.
    let mut active: bank::ActiveModel = Bank::find_by_id(seeded_bank.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap()
        .into();
    active.name = Set("Renamed Bank".into());
    active.account_number = Set("0000000000".into());
    active.account_holder = Set("Someone Else".into());
    active.update(app.db()).await.unwrap();

    let payment = Payment::find().one(app.db()).await.unwrap().unwrap();
    assert_eq!(payment.bank_name, "First National");
    assert_eq!(payment.bank_account_number, "1234567890");
    assert_eq!(payment.bank_account_holder, "PT Storefront");
}

// ==================== HTTP surface ====================

mod http {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn checkout_endpoint_creates_an_order() {
        let app = TestApp::new().await;
        let user = app.seed_customer().await;
        let product = app.seed_product("Keyboard", 1000, true).await;
        let bank = app.seed_bank(&user, "First National").await;

        let token = app
            .state
            .auth
            .issue_token(user.user_id, &user.name, &user.email, &user.role)
            .unwrap();

        let payload = json!({
            "items": [{
                "product_id": product.id,
                "product_name": product.name,
                "price": 1000,
                "qty": 2
            }],
            "total_qty": 2,
            "total_price": 2000,
            "bank_id": bank.id,
            "payment_date": "2025-01-10"
        });

        let router = storefront_api::app_router().with_state(app.state.clone());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/orders")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert!(body["order_id"].as_str().is_some());
        assert_eq!(body["message"], "Order created successfully");
    }

    #[tokio::test]
    async fn checkout_without_a_token_is_unauthorized() {
        let app = TestApp::new().await;

        let router = storefront_api::app_router().with_state(app.state.clone());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/orders")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn checkout_with_unknown_bank_returns_field_errors() {
        let app = TestApp::new().await;
        let user = app.seed_customer().await;
        let product = app.seed_product("Keyboard", 1000, true).await;

        let token = app
            .state
            .auth
            .issue_token(user.user_id, &user.name, &user.email, &user.role)
            .unwrap();

        let payload = json!({
            "items": [{
                "product_id": product.id,
                "product_name": product.name,
                "price": 1000,
                "qty": 2
            }],
            "total_qty": 2,
            "total_price": 2000,
            "bank_id": Uuid::new_v4(),
            "payment_date": "2025-01-10"
        });

        let router = storefront_api::app_router().with_state(app.state.clone());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/orders")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["errors"]["bank_id"].as_str().is_some());
    }
}

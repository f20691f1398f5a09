//! Storefront API Library
//!
//! This crate provides the core functionality for the storefront API:
//! a public product catalog, per-user carts, and a transactional checkout
//! that records an order aggregate against a bank-transfer payment.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;
pub mod storage;

use axum::{routing::get, Router};
use std::sync::Arc;

// App state definition
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub auth: Arc<auth::AuthService>,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// The `/api/v1` route tree.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/products", handlers::products::products_routes())
        .nest("/carts", handlers::carts::carts_routes())
        .nest("/cart-items", handlers::cart_items::cart_items_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .nest("/payments", handlers::payments::payments_routes())
        .route("/user/dashboard", get(handlers::dashboard::user_dashboard))
}

/// The full application router, without middleware layers. The binary adds
/// tracing and CORS on top; tests drive this router directly.
pub fn app_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(|| async { "storefront-api up" }))
        .route("/health", get(handlers::health::health))
        .nest("/api/v1", api_v1_routes())
}

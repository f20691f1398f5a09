use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::carts::{CreateCartInput, UpdateCartInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_carts))
        .route("/", post(create_cart))
        .route("/:id", get(get_cart))
        .route("/:id", put(update_cart))
        .route("/:id", delete(delete_cart))
}

/// List carts: admins see every cart, users their own
async fn list_carts(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let carts = state
        .services
        .carts
        .list_carts(&user)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "carts": carts })))
}

/// Create a new cart
async fn create_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateCartInput {
        cart_name: payload.cart_name,
        schedule: payload.schedule,
    };

    let cart = state
        .services
        .carts
        .create_cart(&user, input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(json!({
        "message": "Cart created successfully",
        "cart": cart,
    })))
}

/// Get a cart with its product lines
async fn get_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .carts
        .get_cart(&user, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "cart": cart })))
}

/// Update a cart's name or schedule
async fn update_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateCartInput {
        cart_name: payload.cart_name,
        schedule: payload.schedule,
    };

    let cart = state
        .services
        .carts
        .update_cart(&user, id, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "message": "Cart updated successfully",
        "cart": cart,
    })))
}

/// Delete a cart and its items
async fn delete_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .carts
        .delete_cart(&user, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "message": "Cart deleted successfully",
    })))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCartRequest {
    #[validate(length(min = 1, max = 30, message = "The cart name must be between 1 and 30 characters"))]
    pub cart_name: String,
    pub schedule: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartRequest {
    #[validate(length(min = 1, max = 255, message = "The cart name must be between 1 and 255 characters"))]
    pub cart_name: Option<String>,
    pub schedule: Option<DateTime<Utc>>,
}

use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::carts::AddCartItemInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart item endpoints
pub fn cart_items_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(add_item))
        .route("/:id", put(update_item))
        .route("/:id", delete(remove_item))
}

/// Add a product to a cart; merges quantity when the product is already there
async fn add_item(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = AddCartItemInput {
        cart_id: payload.cart_id,
        product_id: payload.product_id,
        qty: payload.qty,
    };

    let outcome = state
        .services
        .carts
        .add_item(input)
        .await
        .map_err(map_service_error)?;

    let message = if outcome.merged {
        "Quantity increased for the product already in the cart"
    } else {
        "Product added to the cart"
    };

    Ok(created_response(json!({
        "message": message,
        "data": outcome.item,
    })))
}

/// Update a cart item's quantity
async fn update_item(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let item = state
        .services
        .carts
        .update_item(id, payload.qty)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "message": "Cart item updated successfully",
        "data": item,
    })))
}

/// Remove an item from its cart
async fn remove_item(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .carts
        .remove_item(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "message": "Cart item removed successfully",
    })))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub cart_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "The quantity must be at least 1"))]
    pub qty: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 1, message = "The quantity must be at least 1"))]
    pub qty: i32,
}

use crate::handlers::checkout_payload::CheckoutPayload;
use crate::handlers::common::{created_response, map_service_error};
use crate::{auth::AuthUser, errors::ApiError, AppState};
use axum::{extract::State, response::IntoResponse, routing::post, Router};
use std::sync::Arc;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(submit_order))
}

/// Submit a checkout request: creates the order, its items and the payment
/// record atomically, stores the optional proof file and removes the source
/// cart.
async fn submit_order(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    CheckoutPayload(request): CheckoutPayload,
) -> Result<impl IntoResponse, ApiError> {
    let confirmation = state
        .services
        .orders
        .submit_order(&user, request)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(confirmation))
}

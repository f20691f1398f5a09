use crate::handlers::common::{map_service_error, success_response, PaginatedResponse};
use crate::{auth::AuthUser, errors::ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for payment endpoints (admin back office)
pub fn payments_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_payments))
        .route("/:id", get(get_payment))
}

/// Paginated payment listing with search over the bank snapshot fields
async fn list_payments(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<PaymentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(5).max(1);

    let (payments, total) = state
        .services
        .payments
        .list(&user, query.search.as_deref(), page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "payments": PaginatedResponse::new(payments, page, per_page, total),
    })))
}

/// Payment detail with its order and order lines
async fn get_payment(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .payments
        .get(&user, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "payment": detail })))
}

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

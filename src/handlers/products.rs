use crate::handlers::common::{map_service_error, success_response, PaginatedResponse};
use crate::{errors::ApiError, services::products::ProductListQuery, AppState};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for the public product catalog
pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}

/// Paginated listing of published products
async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(5).max(1);

    let (products, total) = state
        .services
        .products
        .list(query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "products": PaginatedResponse::new(products, page, per_page, total),
    })))
}

/// Product detail
async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "product": product })))
}

use crate::handlers::common::{map_service_error, success_response};
use crate::{auth::AuthUser, errors::ApiError, AppState};
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

/// Per-user dashboard summary
pub async fn user_dashboard(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .services
        .dashboard
        .summary(&user)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(summary))
}

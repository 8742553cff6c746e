use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};

use crate::handlers::common::{created_response, success_response};
use crate::{
    entities::usuario::Rol,
    errors::ServiceError,
    services::users::{LoginRequest, RegistroRequest},
    AppState,
};

/// Creates the router for authentication endpoints
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/registro", post(registro))
        .route("/login", post(login))
}

/// Self-service registration; always creates a customer account.
async fn registro(
    State(state): State<AppState>,
    Json(payload): Json<RegistroRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .users
        .register(payload, Rol::Cliente)
        .await?;
    Ok(created_response(user))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state.services.users.login(payload).await?;
    Ok(success_response(response))
}

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::handlers::common::{created_response, no_content_response, success_response};
use crate::{auth::AuthUser, errors::ServiceError, services::addresses::DireccionRequest, AppState};

/// Creates the router for shipping addresses, always scoped to the caller
pub fn direcciones_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_direcciones).post(create_direccion))
        .route(
            "/:id",
            get(get_direccion).put(update_direccion).delete(delete_direccion),
        )
}

async fn list_direcciones(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let direcciones = state.services.addresses.list_for_user(auth.user_id).await?;
    Ok(success_response(direcciones))
}

async fn create_direccion(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<DireccionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let direccion = state
        .services
        .addresses
        .create(auth.user_id, payload)
        .await?;
    Ok(created_response(direccion))
}

async fn get_direccion(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let direccion = state.services.addresses.get_owned(id, auth.user_id).await?;
    Ok(success_response(direccion))
}

async fn update_direccion(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<DireccionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let direccion = state
        .services
        .addresses
        .update(id, auth.user_id, payload)
        .await?;
    Ok(success_response(direccion))
}

async fn delete_direccion(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.addresses.delete(id, auth.user_id).await?;
    Ok(no_content_response())
}

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::handlers::common::{created_response, no_content_response, success_response};
use crate::{
    auth::AuthUser, entities::usuario::Rol, errors::ServiceError,
    services::packages::PaqueteRequest, AppState,
};

/// Creates the router for the package catalog. Reads are public; mutations
/// are admin only.
pub fn paquetes_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_paquetes).post(create_paquete))
        .route(
            "/:id",
            get(get_paquete).put(update_paquete).delete(delete_paquete),
        )
}

async fn list_paquetes(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let paquetes = state.services.packages.list_active().await?;
    Ok(success_response(paquetes))
}

async fn get_paquete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let paquete = state
        .services
        .packages
        .find_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::PackageNotFound(id.to_string()))?;
    Ok(success_response(paquete))
}

async fn create_paquete(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<PaqueteRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_role(Rol::Admin)?;
    let paquete = state.services.packages.create(payload).await?;
    Ok(created_response(paquete))
}

async fn update_paquete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<PaqueteRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_role(Rol::Admin)?;
    let paquete = state.services.packages.update(id, payload).await?;
    Ok(success_response(paquete))
}

async fn delete_paquete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_role(Rol::Admin)?;
    state.services.packages.delete(id).await?;
    Ok(no_content_response())
}

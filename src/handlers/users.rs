use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::handlers::common::{created_response, no_content_response, success_response};
use crate::{
    auth::AuthUser,
    entities::usuario::Rol,
    errors::ServiceError,
    services::users::RegistroRequest,
    AppState,
};

/// Creates the router for account administration (admin only)
pub fn usuarios_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_usuarios).post(create_usuario))
        .route("/:id", get(get_usuario).delete(delete_usuario))
}

#[derive(Debug, Deserialize)]
struct AdminCreateUsuarioRequest {
    #[serde(flatten)]
    registro: RegistroRequest,
    rol: Rol,
}

async fn list_usuarios(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_role(Rol::Admin)?;
    let usuarios = state.services.users.list().await?;
    Ok(success_response(usuarios))
}

/// Admin provisioning; unlike self-service registration the role is free.
async fn create_usuario(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<AdminCreateUsuarioRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_role(Rol::Admin)?;
    let user = state
        .services
        .users
        .register(payload.registro, payload.rol)
        .await?;
    Ok(created_response(user))
}

async fn get_usuario(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    if !auth.is_admin() && auth.user_id != id {
        return Err(ServiceError::Forbidden("not your account".into()));
    }
    let user = state
        .services
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::UserNotFound(id.to_string()))?;
    Ok(success_response(user))
}

async fn delete_usuario(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_role(Rol::Admin)?;
    state.services.users.delete(id).await?;
    Ok(no_content_response())
}

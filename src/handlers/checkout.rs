use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use crate::handlers::common::success_response;
use crate::{
    auth::AuthUser,
    entities::usuario::Rol,
    errors::ServiceError,
    services::checkout::CrearSesionInput,
    AppState,
};

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/crear-sesion", post(crear_sesion))
        .route("/verificar-sesion/:session_id", get(verificar_sesion))
}

/// Starts a hosted checkout session for the caller's cart.
async fn crear_sesion(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CrearSesionInput>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_role(Rol::Cliente)?;
    // Customers can only check out their own cart.
    if !auth.is_admin() && payload.id_usuario != auth.user_id {
        return Err(ServiceError::Forbidden(
            "cannot create a checkout session for another user".into(),
        ));
    }

    let session = state.services.checkout.crear_sesion(payload).await?;
    Ok(success_response(session))
}

/// Polling endpoint: the provider's live session state plus the reconciled
/// order, if the webhook already arrived.
async fn verificar_sesion(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.checkout.verificar_sesion(&session_id).await?;
    Ok(success_response(result))
}

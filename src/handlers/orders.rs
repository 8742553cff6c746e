use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::handlers::common::success_response;
use crate::{
    auth::AuthUser,
    entities::pedido::EstadoPedido,
    errors::ServiceError,
    AppState,
};

/// Creates the router for order management
pub fn pedidos_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pedidos))
        .route("/mis-pedidos", get(mis_pedidos))
        .route("/estado/:estado", get(pedidos_por_estado))
        .route("/:id", get(get_pedido))
        .route("/:id/estado", axum::routing::put(update_estado))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_per_page")]
    per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

#[derive(Debug, Deserialize)]
struct UpdateEstadoRequest {
    estado: String,
}

fn parse_estado(value: &str) -> Result<EstadoPedido, ServiceError> {
    EstadoPedido::parse(value)
        .ok_or_else(|| ServiceError::InvalidStatus(format!("unknown order state '{}'", value)))
}

async fn list_pedidos(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_staff()?;
    let pedidos = state
        .services
        .orders
        .list_orders(params.page, params.per_page)
        .await?;
    Ok(success_response(pedidos))
}

async fn mis_pedidos(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let pedidos = state.services.orders.find_by_user_id(auth.user_id).await?;
    Ok(success_response(pedidos))
}

async fn pedidos_por_estado(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(estado): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_staff()?;
    let estado = parse_estado(&estado)?;
    let pedidos = state.services.orders.find_by_estado(estado).await?;
    Ok(success_response(pedidos))
}

async fn get_pedido(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let pedido = state.services.orders.get_order(id).await?;

    let is_owner = pedido.pedido.usuario_id == Some(auth.user_id);
    if !is_owner && auth.require_staff().is_err() {
        return Err(ServiceError::Forbidden("not your order".into()));
    }

    Ok(success_response(pedido))
}

async fn update_estado(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEstadoRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_staff()?;
    let estado = parse_estado(&payload.estado)?;
    let pedido = state.services.orders.update_estado(id, estado).await?;
    Ok(success_response(pedido))
}

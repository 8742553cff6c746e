//! Checkout session orchestration.
//!
//! Validates a client-priced cart against the catalog, re-derives every
//! amount server-side, and only then asks the gateway for a hosted checkout
//! session. This is the single point where monetary trust is established;
//! nothing downstream re-validates prices.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        addresses::AddressService,
        orders::{OrderService, PedidoResponse},
        packages::PackageService,
        stripe::{
            CheckoutLineItem, CheckoutSessionMetadata, CheckoutSessionResult, CreateSessionParams,
            StripeGateway,
        },
        users::UserService,
    },
};

/// Client-claimed carts may deviate from server-side arithmetic by at most
/// one cent per comparison; rounding differs between client and server.
fn within_one_cent(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= Decimal::new(1, 2)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrearSesionInput {
    pub id_usuario: i32,
    pub id_direccion: i32,
    pub nombre_cliente: String,
    pub email_cliente: String,
    pub telefono_cliente: Option<String>,
    pub items: Vec<CheckoutLineItem>,
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Serialize)]
pub struct VerificarSesionResponse {
    pub status: String,
    pub payment_status: String,
    pub pedido: Option<PedidoResponse>,
}

#[derive(Clone)]
pub struct CheckoutService {
    users: Arc<UserService>,
    addresses: Arc<AddressService>,
    packages: Arc<PackageService>,
    orders: Arc<OrderService>,
    gateway: Arc<StripeGateway>,
    event_sender: EventSender,
    iva_rate: Decimal,
}

impl CheckoutService {
    pub fn new(
        users: Arc<UserService>,
        addresses: Arc<AddressService>,
        packages: Arc<PackageService>,
        orders: Arc<OrderService>,
        gateway: Arc<StripeGateway>,
        event_sender: EventSender,
        iva_rate: Decimal,
    ) -> Self {
        Self {
            users,
            addresses,
            packages,
            orders,
            gateway,
            event_sender,
            iva_rate,
        }
    }

    /// Validates the cart and creates a checkout session.
    ///
    /// The checks run in a fixed order and the first failure wins; no
    /// external call is made before the whole cart has been verified.
    #[instrument(skip(self, input), fields(usuario_id = input.id_usuario))]
    pub async fn crear_sesion(
        &self,
        input: CrearSesionInput,
    ) -> Result<CheckoutSessionResult, ServiceError> {
        // 1. Required fields
        if input.nombre_cliente.trim().is_empty()
            || input.email_cliente.trim().is_empty()
            || input.id_direccion <= 0
            || input.items.is_empty()
        {
            return Err(ServiceError::ValidationError(
                "nombre, email, dirección and a non-empty item list are required".into(),
            ));
        }
        if input.success_url.trim().is_empty() || input.cancel_url.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "success_url and cancel_url are required".into(),
            ));
        }
        if input.items.iter().any(|i| i.cantidad < 1) {
            return Err(ServiceError::ValidationError(
                "every item needs a positive quantity".into(),
            ));
        }

        // 2. User must exist
        let user = self
            .users
            .find_by_id(input.id_usuario)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(input.id_usuario.to_string()))?;

        // 3. Address must exist and belong to the user
        let address = self
            .addresses
            .find_by_id(input.id_direccion)
            .await?
            .ok_or_else(|| ServiceError::AddressNotFound(input.id_direccion.to_string()))?;
        if address.usuario_id != user.id {
            return Err(ServiceError::AddressUnauthorized(
                input.id_direccion.to_string(),
            ));
        }

        // 4. Every claimed line must match the catalog
        for item in &input.items {
            let package = self
                .packages
                .find_by_id(item.id_paquete)
                .await?
                .ok_or_else(|| ServiceError::PackageNotFound(item.id_paquete.to_string()))?;

            if !within_one_cent(package.precio, item.precio_unitario) {
                return Err(ServiceError::PriceMismatch(format!(
                    "package '{}' is priced {} but the cart claims {}",
                    package.nombre, package.precio, item.precio_unitario
                )));
            }

            let expected_fotos = package.cantidad_fotos * item.cantidad;
            if item.num_fotos_requeridas != expected_fotos {
                return Err(ServiceError::PhotoCountMismatch(format!(
                    "package '{}' needs {} photos for {} units, cart claims {}",
                    package.nombre, expected_fotos, item.cantidad, item.num_fotos_requeridas
                )));
            }
        }

        // 5-7. Re-derive the money and compare against the claims
        let subtotal: Decimal = input
            .items
            .iter()
            .map(|i| i.precio_unitario * Decimal::from(i.cantidad))
            .sum();
        if !within_one_cent(subtotal, input.subtotal) {
            return Err(ServiceError::SubtotalMismatch(format!(
                "computed {} but the cart claims {}",
                subtotal, input.subtotal
            )));
        }

        let iva = subtotal * self.iva_rate;
        if !within_one_cent(iva, input.iva) {
            return Err(ServiceError::TaxMismatch(format!(
                "computed {} but the cart claims {}",
                iva.round_dp(2),
                input.iva
            )));
        }

        let total = subtotal + iva;
        if !within_one_cent(total, input.total) {
            return Err(ServiceError::TotalMismatch(format!(
                "computed {} but the cart claims {}",
                total.round_dp(2),
                input.total
            )));
        }

        // The session metadata snapshot carries the recomputed amounts, not
        // the claimed ones.
        let metadata = CheckoutSessionMetadata {
            id_usuario: user.id,
            id_direccion: address.id,
            nombre_cliente: input.nombre_cliente,
            email_cliente: input.email_cliente,
            telefono_cliente: input.telefono_cliente,
            items: input.items,
            subtotal: subtotal.round_dp(2),
            iva: iva.round_dp(2),
            total: total.round_dp(2),
        };

        let result = self
            .gateway
            .create_checkout_session(&CreateSessionParams {
                metadata,
                success_url: input.success_url,
                cancel_url: input.cancel_url,
            })
            .await?;

        info!(session_id = %result.session_id, "checkout session created");
        self.event_sender
            .send(Event::CheckoutSessionCreated {
                session_id: result.session_id.clone(),
                usuario_id: user.id,
            })
            .await;

        Ok(result)
    }

    /// Returns the provider's live view of a session next to the locally
    /// reconciled order, uncombined. "Provider says paid but no order yet"
    /// is an expected transient state while the webhook is in flight.
    #[instrument(skip(self))]
    pub async fn verificar_sesion(
        &self,
        session_id: &str,
    ) -> Result<VerificarSesionResponse, ServiceError> {
        if session_id.trim().is_empty() {
            return Err(ServiceError::ValidationError("session_id is required".into()));
        }

        let status = self.gateway.retrieve_session(session_id).await?;
        let pedido = self.orders.find_by_stripe_session_id(session_id).await?;

        Ok(VerificarSesionResponse {
            status: status.status,
            payment_status: status.payment_status,
            pedido,
        })
    }
}

//! Webhook reconciliation.
//!
//! Turns verified provider events into persisted orders, exactly once. The
//! session metadata snapshot is the only input trusted here; client-claimed
//! amounts are never re-accepted at this boundary.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    entities::pedido::EstadoPago,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        orders::{CreateOrderInput, OrderService},
        stripe::{from_minor_units, CheckoutSessionMetadata, StripeGateway, StripeSession},
    },
};

/// Result of processing one webhook delivery.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// A new order was reconciled from the completed session.
    OrderCreated { pedido_id: i32 },
    /// An order for this session already existed; the redelivery is absorbed.
    AlreadyReconciled,
    /// The event required no action.
    Ignored { event_type: String },
}

#[derive(Clone)]
pub struct WebhookService {
    gateway: Arc<StripeGateway>,
    orders: Arc<OrderService>,
    event_sender: EventSender,
}

impl WebhookService {
    pub fn new(
        gateway: Arc<StripeGateway>,
        orders: Arc<OrderService>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            gateway,
            orders,
            event_sender,
        }
    }

    /// Verifies and dispatches one raw webhook delivery.
    ///
    /// Signature verification runs first over the exact raw bytes; no event
    /// data is trusted before it passes. Unknown event types are success,
    /// not errors. Reconciliation failures bubble up as non-2xx so the
    /// provider's redelivery supplies the retry.
    #[instrument(skip(self, payload, signature))]
    pub async fn process(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookOutcome, ServiceError> {
        let event = self.gateway.construct_event(payload, signature)?;

        match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session = parse_session(event.data.object)?;
                self.reconcile_completed_session(session).await
            }
            "checkout.session.expired" => {
                let session_id = session_id_of(&event.data.object);
                info!(%session_id, "checkout session expired; nothing to reconcile");
                self.event_sender
                    .send(Event::CheckoutSessionExpired { session_id })
                    .await;
                Ok(WebhookOutcome::Ignored {
                    event_type: event.event_type,
                })
            }
            "payment_intent.payment_failed" => {
                let payment_intent_id = event
                    .data
                    .object
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                info!(%payment_intent_id, "payment failed event received");
                self.event_sender
                    .send(Event::PaymentFailed { payment_intent_id })
                    .await;
                Ok(WebhookOutcome::Ignored {
                    event_type: event.event_type,
                })
            }
            other => {
                info!(event_type = other, "unhandled webhook event type");
                Ok(WebhookOutcome::Ignored {
                    event_type: other.to_string(),
                })
            }
        }
    }

    /// Creates the order for a completed session, at most once.
    ///
    /// The cheap pre-check keeps redeliveries quiet; the unique index on the
    /// session id column is what actually guarantees at-most-once when two
    /// deliveries race past it.
    async fn reconcile_completed_session(
        &self,
        session: StripeSession,
    ) -> Result<WebhookOutcome, ServiceError> {
        let metadata = CheckoutSessionMetadata::from_metadata_map(session.metadata.as_ref())?;

        if let Some(existing) = self.orders.find_by_stripe_session_id(&session.id).await? {
            info!(
                pedido_id = existing.pedido.id,
                session_id = %session.id,
                "order already reconciled for this session"
            );
            return Ok(WebhookOutcome::AlreadyReconciled);
        }

        // The provider's captured total is authoritative over the snapshot.
        let total = session
            .amount_total
            .map(from_minor_units)
            .unwrap_or(metadata.total);

        let telefono = metadata.telefono_cliente.clone().or_else(|| {
            session
                .customer_details
                .as_ref()
                .and_then(|d| d.phone.clone())
        });

        let input = CreateOrderInput {
            usuario_id: Some(metadata.id_usuario),
            direccion_id: Some(metadata.id_direccion),
            id_pago_stripe: session.payment_intent.clone(),
            id_sesion_stripe: Some(session.id.clone()),
            nombre_cliente: metadata.nombre_cliente,
            email_cliente: metadata.email_cliente,
            telefono_cliente: telefono,
            items: metadata.items,
            subtotal: metadata.subtotal,
            iva: metadata.iva,
            total,
            estado_pago: EstadoPago::Pagado,
        };

        match self.orders.create_order(input).await {
            Ok(created) => {
                info!(
                    pedido_id = created.pedido.id,
                    session_id = %session.id,
                    "order reconciled from completed session"
                );
                Ok(WebhookOutcome::OrderCreated {
                    pedido_id: created.pedido.id,
                })
            }
            Err(ServiceError::Conflict(_)) => {
                // A concurrent delivery won the insert race.
                warn!(session_id = %session.id, "duplicate reconciliation absorbed by unique index");
                Ok(WebhookOutcome::AlreadyReconciled)
            }
            Err(e) => {
                error!(session_id = %session.id, error = %e, "order reconciliation failed");
                Err(ServiceError::ReconcileError(e.to_string()))
            }
        }
    }
}

fn parse_session(object: serde_json::Value) -> Result<StripeSession, ServiceError> {
    serde_json::from_value(object).map_err(|e| {
        ServiceError::ValidationError(format!("event object is not a checkout session: {}", e))
    })
}

fn session_id_of(object: &serde_json::Value) -> String {
    object
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

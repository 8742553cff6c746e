use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Events emitted by the services. Consumed by a single logging task today;
/// the channel is the seam where outbound notifications would attach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutSessionCreated {
        session_id: String,
        usuario_id: i32,
    },
    CheckoutSessionExpired {
        session_id: String,
    },
    OrderCreated {
        pedido_id: i32,
        session_id: String,
    },
    OrderStatusChanged {
        pedido_id: i32,
        old_estado: String,
        new_estado: String,
    },
    PaymentFailed {
        payment_intent_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event; delivery is best-effort and never fails the caller.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to publish event: {}", e);
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                pedido_id,
                session_id,
            } => info!(pedido_id, %session_id, "event: order created"),
            Event::OrderStatusChanged {
                pedido_id,
                old_estado,
                new_estado,
            } => info!(pedido_id, %old_estado, %new_estado, "event: order status changed"),
            Event::CheckoutSessionCreated {
                session_id,
                usuario_id,
            } => info!(%session_id, usuario_id, "event: checkout session created"),
            Event::CheckoutSessionExpired { session_id } => {
                info!(%session_id, "event: checkout session expired")
            }
            Event::PaymentFailed { payment_intent_id } => {
                info!(%payment_intent_id, "event: payment failed")
            }
        }
    }
}

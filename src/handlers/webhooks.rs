use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::warn;

use crate::{errors::ServiceError, AppState};

/// Creates the router for inbound payment-provider webhooks. No auth: trust
/// comes from the signature over the raw body.
pub fn webhooks_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// The body must stay unparsed until the signature over the exact byte
/// sequence has been verified.
async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            warn!("webhook delivery without Stripe-Signature header");
            ServiceError::InvalidSignature("missing Stripe-Signature header".into())
        })?;

    let outcome = state.services.webhooks.process(&body, signature).await?;
    Ok(Json(outcome))
}

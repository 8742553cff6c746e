//! Stripe gateway adapter.
//!
//! Wraps the Stripe REST API for checkout session creation/retrieval and
//! verifies inbound webhook payloads. Signature verification runs over the
//! exact raw request bytes with constant-time comparison and a timestamp
//! tolerance window.

use std::collections::HashMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Clock skew tolerance for webhook timestamps that are in the future.
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Gateway configuration, owned by the process bootstrap and injected into
/// the services that need it.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub webhook_tolerance_secs: u64,
    pub currency: String,
}

impl StripeConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            secret_key: cfg.stripe_secret_key.clone(),
            webhook_secret: cfg.stripe_webhook_secret.clone(),
            api_base: cfg.stripe_api_base.trim_end_matches('/').to_string(),
            webhook_tolerance_secs: cfg.stripe_webhook_tolerance_secs,
            currency: cfg.currency.clone(),
        }
    }
}

/// A cart line as validated by checkout and frozen into session metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    pub id_paquete: i32,
    pub nombre_paquete: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categoria_paquete: Option<String>,
    pub precio_unitario: Decimal,
    pub cantidad: i32,
    pub num_fotos_requeridas: i32,
}

/// The order-reconstruction snapshot carried through the provider's opaque
/// session metadata. This is the only data shared between checkout and the
/// webhook reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSessionMetadata {
    pub id_usuario: i32,
    pub id_direccion: i32,
    pub nombre_cliente: String,
    pub email_cliente: String,
    pub telefono_cliente: Option<String>,
    pub items: Vec<CheckoutLineItem>,
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
}

impl CheckoutSessionMetadata {
    /// Flattens the snapshot into Stripe's string-to-string metadata map.
    pub fn to_entries(&self) -> Result<Vec<(String, String)>, ServiceError> {
        let items_json = serde_json::to_string(&self.items)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;

        Ok(vec![
            ("metadata[id_usuario]".into(), self.id_usuario.to_string()),
            (
                "metadata[id_direccion]".into(),
                self.id_direccion.to_string(),
            ),
            ("metadata[nombre_cliente]".into(), self.nombre_cliente.clone()),
            ("metadata[email_cliente]".into(), self.email_cliente.clone()),
            (
                "metadata[telefono_cliente]".into(),
                self.telefono_cliente.clone().unwrap_or_default(),
            ),
            ("metadata[items_json]".into(), items_json),
            ("metadata[subtotal]".into(), self.subtotal.to_string()),
            ("metadata[iva]".into(), self.iva.to_string()),
            ("metadata[total]".into(), self.total.to_string()),
        ])
    }

    /// Rebuilds the snapshot from a session's metadata map, failing closed:
    /// an absent map is a foreign/malformed event, a present-but-unparsable
    /// one is invalid.
    pub fn from_metadata_map(
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<Self, ServiceError> {
        let map = metadata
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ServiceError::MetadataMissing("session carries no metadata".into()))?;

        let field = |key: &str| -> Result<&String, ServiceError> {
            map.get(key).ok_or_else(|| {
                ServiceError::MetadataInvalid(format!("missing metadata field '{}'", key))
            })
        };

        let id_usuario = field("id_usuario")?.parse::<i32>().map_err(|_| {
            ServiceError::MetadataInvalid("id_usuario is not an integer".into())
        })?;
        let id_direccion = field("id_direccion")?.parse::<i32>().map_err(|_| {
            ServiceError::MetadataInvalid("id_direccion is not an integer".into())
        })?;

        let items: Vec<CheckoutLineItem> = serde_json::from_str(field("items_json")?)
            .map_err(|e| ServiceError::MetadataInvalid(format!("items_json: {}", e)))?;
        if items.is_empty() {
            return Err(ServiceError::MetadataInvalid("items_json is empty".into()));
        }

        let decimal_field = |key: &str| -> Result<Decimal, ServiceError> {
            field(key)?.parse::<Decimal>().map_err(|_| {
                ServiceError::MetadataInvalid(format!("'{}' is not a decimal amount", key))
            })
        };

        Ok(Self {
            id_usuario,
            id_direccion,
            nombre_cliente: field("nombre_cliente")?.clone(),
            email_cliente: field("email_cliente")?.clone(),
            telefono_cliente: map
                .get("telefono_cliente")
                .filter(|t| !t.is_empty())
                .cloned(),
            items,
            subtotal: decimal_field("subtotal")?,
            iva: decimal_field("iva")?,
            total: decimal_field("total")?,
        })
    }
}

/// Parameters for creating a checkout session. The metadata snapshot carries
/// the customer and the priced cart; the amounts in it are the server-side
/// recomputed ones.
#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub metadata: CheckoutSessionMetadata,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionResult {
    pub session_id: String,
    pub url: String,
}

/// Checkout session object as returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub customer_details: Option<StripeCustomerDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomerDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub status: String,
    pub payment_status: String,
    pub session: StripeSession,
}

/// A verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default)]
    pub created: i64,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(default)]
    message: Option<String>,
}

/// Converts a currency amount to the provider's minor units (centavos).
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| ServiceError::InternalError(format!("amount out of range: {}", amount)))
}

/// Converts the provider's minor units back to a currency amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

#[derive(Clone)]
pub struct StripeGateway {
    config: StripeConfig,
    http: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Creates a hosted checkout session: one line per cart item plus a
    /// separate IVA line, with the metadata snapshot attached.
    pub async fn create_checkout_session(
        &self,
        params: &CreateSessionParams,
    ) -> Result<CheckoutSessionResult, ServiceError> {
        let meta = &params.metadata;
        let mut form: Vec<(String, String)> = vec![
            ("payment_method_types[0]".into(), "card".into()),
            ("mode".into(), "payment".into()),
            ("customer_email".into(), meta.email_cliente.clone()),
            ("success_url".into(), params.success_url.clone()),
            ("cancel_url".into(), params.cancel_url.clone()),
        ];

        for (i, item) in meta.items.iter().enumerate() {
            form.push((
                format!("line_items[{}][price_data][currency]", i),
                self.config.currency.clone(),
            ));
            form.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                item.nombre_paquete.clone(),
            ));
            if let Some(categoria) = &item.categoria_paquete {
                form.push((
                    format!("line_items[{}][price_data][product_data][description]", i),
                    categoria.clone(),
                ));
            }
            form.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                to_minor_units(item.precio_unitario)?.to_string(),
            ));
            form.push((format!("line_items[{}][quantity]", i), item.cantidad.to_string()));
        }

        if meta.iva > Decimal::ZERO {
            let i = meta.items.len();
            form.push((
                format!("line_items[{}][price_data][currency]", i),
                self.config.currency.clone(),
            ));
            form.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                "IVA (16%)".into(),
            ));
            form.push((
                format!("line_items[{}][price_data][product_data][description]", i),
                "Impuesto al Valor Agregado".into(),
            ));
            form.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                to_minor_units(meta.iva)?.to_string(),
            ));
            form.push((format!("line_items[{}][quantity]", i), "1".into()));
        }

        form.extend(meta.to_entries()?);

        let url = format!("{}/v1/checkout/sessions", self.config.api_base);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.secret_key, Option::<&str>::None)
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("request failed: {}", e)))?;

        let session: StripeSession = Self::parse_response(response, "create checkout session").await?;

        let redirect_url = session.url.ok_or_else(|| {
            ServiceError::GatewayError("checkout session carries no redirect URL".into())
        })?;

        Ok(CheckoutSessionResult {
            session_id: session.id,
            url: redirect_url,
        })
    }

    /// Fetches the live status of a checkout session.
    pub async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, ServiceError> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base, session_id
        );
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.secret_key, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("request failed: {}", e)))?;

        let session: StripeSession = Self::parse_response(response, "retrieve session").await?;

        Ok(SessionStatus {
            status: session.status.clone().unwrap_or_else(|| "unknown".into()),
            payment_status: session
                .payment_status
                .clone()
                .unwrap_or_else(|| "unknown".into()),
            session,
        })
    }

    /// Verifies the `Stripe-Signature` header against the raw payload and
    /// parses the event. Nothing in the payload is trusted before this
    /// returns.
    pub fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, ServiceError> {
        let (timestamp, v1) = parse_signature_header(signature_header)?;

        let now = Utc::now().timestamp();
        let age = now - timestamp;
        if age > self.config.webhook_tolerance_secs as i64 {
            warn!(age_secs = age, "webhook timestamp outside tolerance");
            return Err(ServiceError::InvalidSignature(format!(
                "event too old ({}s)",
                age
            )));
        }
        if age < -MAX_FUTURE_TOLERANCE_SECS {
            warn!(age_secs = age, "webhook timestamp in the future");
            return Err(ServiceError::InvalidSignature(
                "event timestamp in the future".into(),
            ));
        }

        let mut mac = HmacSha256::new_from_slice(self.config.webhook_secret.as_bytes())
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        if !constant_time_eq(&expected, &v1) {
            warn!("webhook signature verification failed");
            return Err(ServiceError::InvalidSignature(
                "signature does not match payload".into(),
            ));
        }

        serde_json::from_slice(payload).map_err(|e| {
            error!("verified webhook payload is not a valid event: {}", e);
            ServiceError::ValidationError(format!("malformed event payload: {}", e))
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            error!(%status, "stripe {} failed: {}", context, message);
            return Err(ServiceError::GatewayError(format!(
                "{} failed: {}",
                context, message
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("unparsable response: {}", e)))
    }
}

/// Extracts `t` and `v1` from a `Stripe-Signature` header value.
fn parse_signature_header(header: &str) -> Result<(i64, String), ServiceError> {
    let mut timestamp = None;
    let mut v1 = None;
    for part in header.split(',') {
        let mut it = part.trim().splitn(2, '=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => timestamp = val.parse::<i64>().ok(),
            (Some("v1"), Some(val)) => v1 = Some(val.to_string()),
            _ => {}
        }
    }

    match (timestamp, v1) {
        (Some(t), Some(sig)) => Ok((t, sig)),
        _ => Err(ServiceError::InvalidSignature(
            "signature header missing t or v1".into(),
        )),
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gateway(secret: &str) -> StripeGateway {
        StripeGateway::new(StripeConfig {
            secret_key: "sk_test_123".into(),
            webhook_secret: secret.into(),
            api_base: "https://api.stripe.com".into(),
            webhook_tolerance_secs: 300,
            currency: "mxn".into(),
        })
    }

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    fn sample_event() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "livemode": false,
            "created": 1_700_000_000,
            "data": { "object": { "id": "cs_test_1" } }
        }))
        .unwrap()
    }

    #[test]
    fn valid_signature_parses_event() {
        let payload = sample_event();
        let header = sign("whsec_abc", Utc::now().timestamp(), &payload);

        let event = gateway("whsec_abc").construct_event(&payload, &header).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.id, "evt_1");
    }

    #[test]
    fn wrong_secret_is_rejected_before_parsing() {
        let payload = sample_event();
        let header = sign("whsec_other", Utc::now().timestamp(), &payload);

        let err = gateway("whsec_abc")
            .construct_event(&payload, &header)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSignature(_)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let payload = sample_event();
        let header = sign("whsec_abc", Utc::now().timestamp(), &payload);

        let mut tampered = payload.clone();
        tampered[10] ^= 0x01;
        let err = gateway("whsec_abc")
            .construct_event(&tampered, &header)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSignature(_)));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = sample_event();
        let header = sign("whsec_abc", Utc::now().timestamp() - 10_000, &payload);

        let err = gateway("whsec_abc")
            .construct_event(&payload, &header)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSignature(_)));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let payload = sample_event();
        let err = gateway("whsec_abc")
            .construct_event(&payload, "v1=deadbeef")
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSignature(_)));
    }

    #[test]
    fn metadata_round_trip() {
        let metadata = CheckoutSessionMetadata {
            id_usuario: 7,
            id_direccion: 3,
            nombre_cliente: "Ana Torres".into(),
            email_cliente: "ana@example.com".into(),
            telefono_cliente: Some("5512345678".into()),
            items: vec![CheckoutLineItem {
                id_paquete: 1,
                nombre_paquete: "Paquete Premium".into(),
                categoria_paquete: Some("Impresión".into()),
                precio_unitario: dec!(299.99),
                cantidad: 2,
                num_fotos_requeridas: 20,
            }],
            subtotal: dec!(599.98),
            iva: dec!(95.99),
            total: dec!(695.97),
        };

        let map: HashMap<String, String> = metadata
            .to_entries()
            .unwrap()
            .into_iter()
            .map(|(k, v)| {
                let key = k
                    .trim_start_matches("metadata[")
                    .trim_end_matches(']')
                    .to_string();
                (key, v)
            })
            .collect();

        let rebuilt = CheckoutSessionMetadata::from_metadata_map(Some(&map)).unwrap();
        assert_eq!(rebuilt, metadata);
    }

    #[test]
    fn absent_metadata_fails_closed_as_missing() {
        let err = CheckoutSessionMetadata::from_metadata_map(None).unwrap_err();
        assert!(matches!(err, ServiceError::MetadataMissing(_)));

        let empty = HashMap::new();
        let err = CheckoutSessionMetadata::from_metadata_map(Some(&empty)).unwrap_err();
        assert!(matches!(err, ServiceError::MetadataMissing(_)));
    }

    #[test]
    fn unparsable_metadata_fails_closed_as_invalid() {
        let mut map = HashMap::new();
        map.insert("id_usuario".to_string(), "not-a-number".to_string());
        let err = CheckoutSessionMetadata::from_metadata_map(Some(&map)).unwrap_err();
        assert!(matches!(err, ServiceError::MetadataInvalid(_)));
    }

    #[test]
    fn minor_unit_conversion_rounds_to_centavos() {
        assert_eq!(to_minor_units(dec!(299.99)).unwrap(), 29_999);
        assert_eq!(to_minor_units(dec!(95.9968)).unwrap(), 9_600);
        assert_eq!(from_minor_units(69_597), dec!(695.97));
    }
}

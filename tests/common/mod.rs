//! Shared test harness: the full router over an in-memory database, with the
//! payment provider stubbed by a local mock server.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use fotolab_api as api;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use sha2::Sha256;
use tower::util::ServiceExt;
use wiremock::MockServer;

use api::auth::{AuthConfig, AuthService};
use api::entities::usuario::Rol;
use api::services::users::RegistroRequest;

pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";
pub const JWT_SECRET: &str =
    "integration_test_secret_that_is_long_enough_for_hs256_token_signing";

pub struct TestApp {
    pub router: Router,
    pub mock: MockServer,
    pub auth: Arc<AuthService>,
    pub services: api::handlers::AppServices,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("sqlite in-memory connection");
        api::migrator::Migrator::up(&db, None)
            .await
            .expect("migrations");
        let db = Arc::new(db);

        let mock = MockServer::start().await;

        let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
        let event_sender = api::events::EventSender::new(event_tx);
        tokio::spawn(api::events::process_events(event_rx));

        let auth = Arc::new(AuthService::new(AuthConfig::new(
            JWT_SECRET.into(),
            Duration::from_secs(3600),
        )));

        let gateway = Arc::new(api::services::stripe::StripeGateway::new(
            api::services::stripe::StripeConfig {
                secret_key: "sk_test_123".into(),
                webhook_secret: WEBHOOK_SECRET.into(),
                api_base: mock.uri(),
                webhook_tolerance_secs: 300,
                currency: "mxn".into(),
            },
        ));

        let services = api::handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            auth.clone(),
            gateway,
            dec!(0.16),
        );

        let config = api::config::AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt_secret: JWT_SECRET.into(),
            jwt_expiration: 3600,
            host: "127.0.0.1".into(),
            port: 0,
            environment: "development".into(),
            log_level: "debug".into(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            stripe_secret_key: "sk_test_123".into(),
            stripe_webhook_secret: WEBHOOK_SECRET.into(),
            stripe_api_base: mock.uri(),
            stripe_webhook_tolerance_secs: 300,
            currency: "mxn".into(),
            iva_rate: 0.16,
        };

        let state = api::AppState {
            db,
            config,
            event_sender,
            services: services.clone(),
        };

        let router = api::build_router(state, auth.clone());

        Self {
            router,
            mock,
            auth,
            services,
        }
    }

    /// Registers an account with the given role and returns (user id, token).
    pub async fn register_user(&self, email: &str, rol: Rol) -> (i32, String) {
        let user = self
            .services
            .users
            .register(
                RegistroRequest {
                    nombre: "Ana Torres".into(),
                    email: email.into(),
                    password: "correcthorse".into(),
                    telefono: None,
                },
                rol,
            )
            .await
            .expect("register user");
        let token = self.auth.issue_token(&user).expect("issue token");
        (user.id, token)
    }

    pub async fn seed_address(&self, usuario_id: i32) -> i32 {
        self.services
            .addresses
            .create(
                usuario_id,
                api::services::addresses::DireccionRequest {
                    calle: "Av. Reforma 123".into(),
                    colonia: None,
                    ciudad: "CDMX".into(),
                    estado: "CDMX".into(),
                    codigo_postal: "06600".into(),
                    pais: "México".into(),
                    telefono: None,
                    predeterminada: true,
                },
            )
            .await
            .expect("seed address")
            .id
    }

    pub async fn seed_package(&self, nombre: &str, precio: Decimal, fotos: i32) -> i32 {
        self.services
            .packages
            .create(api::services::packages::PaqueteRequest {
                nombre: nombre.into(),
                categoria: Some("Impresión".into()),
                precio,
                cantidad_fotos: fotos,
                activo: true,
            })
            .await
            .expect("seed package")
            .id
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Delivers a signed webhook payload to the Stripe endpoint.
    pub async fn deliver_webhook(&self, payload: &[u8], signature: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/webhooks/stripe")
            .header("Stripe-Signature", signature)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_vec()))
            .unwrap();

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }
}

pub fn sign_webhook(secret: &str, payload: &[u8]) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

//! End-to-end checkout flow through the HTTP router: cart validation,
//! session creation, webhook reconciliation and session polling.

mod common;

use axum::http::Method;
use common::{response_json, sign_webhook, TestApp, WEBHOOK_SECRET};
use fotolab_api::entities::usuario::Rol;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn cart_payload(usuario_id: i32, direccion_id: i32, paquete_id: i32) -> serde_json::Value {
    json!({
        "id_usuario": usuario_id,
        "id_direccion": direccion_id,
        "nombre_cliente": "Ana Torres",
        "email_cliente": "ana@example.com",
        "items": [{
            "id_paquete": paquete_id,
            "nombre_paquete": "Paquete Premium",
            "precio_unitario": 299.99,
            "cantidad": 2,
            "num_fotos_requeridas": 20
        }],
        "subtotal": 599.98,
        "iva": 95.99,
        "total": 695.97,
        "success_url": "https://shop.example.com/gracias",
        "cancel_url": "https://shop.example.com/carrito"
    })
}

fn completed_event(session_id: &str, usuario_id: i32, direccion_id: i32, paquete_id: i32) -> Vec<u8> {
    let items = json!([{
        "id_paquete": paquete_id,
        "nombre_paquete": "Paquete Premium",
        "precio_unitario": "299.99",
        "cantidad": 2,
        "num_fotos_requeridas": 20
    }]);
    serde_json::to_vec(&json!({
        "id": "evt_integration_1",
        "type": "checkout.session.completed",
        "livemode": false,
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": {
            "id": session_id,
            "payment_intent": "pi_integration_1",
            "amount_total": 69_598,
            "status": "complete",
            "payment_status": "paid",
            "metadata": {
                "id_usuario": usuario_id.to_string(),
                "id_direccion": direccion_id.to_string(),
                "nombre_cliente": "Ana Torres",
                "email_cliente": "ana@example.com",
                "telefono_cliente": "",
                "items_json": items.to_string(),
                "subtotal": "599.98",
                "iva": "96.00",
                "total": "695.98"
            }
        }}
    }))
    .unwrap()
}

#[tokio::test]
async fn full_checkout_and_reconciliation_flow() {
    let app = TestApp::new().await;
    let (usuario_id, token) = app.register_user("ana@example.com", Rol::Cliente).await;
    let direccion_id = app.seed_address(usuario_id).await;
    let paquete_id = app.seed_package("Paquete Premium", dec!(299.99), 10).await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_int_1",
            "url": "https://checkout.stripe.com/pay/cs_int_1",
            "status": "open",
            "payment_status": "unpaid"
        })))
        .mount(&app.mock)
        .await;

    // Create the checkout session
    let response = app
        .request(
            Method::POST,
            "/api/checkout/crear-sesion",
            Some(&token),
            Some(cart_payload(usuario_id, direccion_id, paquete_id)),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["session_id"], "cs_int_1");

    // Deliver the completed-session webhook
    let payload = completed_event("cs_int_1", usuario_id, direccion_id, paquete_id);
    let signature = sign_webhook(WEBHOOK_SECRET, &payload);
    let response = app.deliver_webhook(&payload, &signature).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["outcome"], "order_created");

    // Redelivery of the same event must not create a second order
    let response = app.deliver_webhook(&payload, &signature).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["outcome"], "already_reconciled");

    // The session poll shows the provider state and the reconciled order
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_int_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_int_1",
            "status": "complete",
            "payment_status": "paid"
        })))
        .mount(&app.mock)
        .await;

    let response = app
        .request(
            Method::GET,
            "/api/checkout/verificar-sesion/cs_int_1",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "complete");
    assert_eq!(body["data"]["payment_status"], "paid");
    assert_eq!(body["data"]["pedido"]["id_sesion_stripe"], "cs_int_1");

    // And the customer sees exactly one order
    let response = app
        .request(Method::GET, "/api/pedidos/mis-pedidos", Some(&token), None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn mismatched_subtotal_is_rejected_without_touching_the_gateway() {
    let app = TestApp::new().await;
    let (usuario_id, token) = app.register_user("ana@example.com", Rol::Cliente).await;
    let direccion_id = app.seed_address(usuario_id).await;
    let paquete_id = app.seed_package("Paquete Premium", dec!(299.99), 10).await;

    let mut payload = cart_payload(usuario_id, direccion_id, paquete_id);
    payload["subtotal"] = json!(500.00);

    let response = app
        .request(
            Method::POST,
            "/api/checkout/crear-sesion",
            Some(&token),
            Some(payload),
        )
        .await;
    assert_eq!(response.status(), 422);
    let body = response_json(response).await;
    assert_eq!(body["code"], "SUBTOTAL_MISMATCH");

    assert!(app.mock.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn checkout_requires_a_customer_token() {
    let app = TestApp::new().await;
    let (usuario_id, _) = app.register_user("ana@example.com", Rol::Cliente).await;
    let direccion_id = app.seed_address(usuario_id).await;
    let paquete_id = app.seed_package("Paquete Premium", dec!(299.99), 10).await;

    let response = app
        .request(
            Method::POST,
            "/api/checkout/crear-sesion",
            None,
            Some(cart_payload(usuario_id, direccion_id, paquete_id)),
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn customers_cannot_check_out_for_someone_else() {
    let app = TestApp::new().await;
    let (owner_id, _) = app.register_user("ana@example.com", Rol::Cliente).await;
    let (_, other_token) = app.register_user("otro@example.com", Rol::Cliente).await;
    let direccion_id = app.seed_address(owner_id).await;
    let paquete_id = app.seed_package("Paquete Premium", dec!(299.99), 10).await;

    let response = app
        .request(
            Method::POST,
            "/api/checkout/crear-sesion",
            Some(&other_token),
            Some(cart_payload(owner_id, direccion_id, paquete_id)),
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_unauthorized() {
    let app = TestApp::new().await;
    let payload = completed_event("cs_int_2", 1, 1, 1);
    let signature = sign_webhook("whsec_not_the_secret", &payload);

    let response = app.deliver_webhook(&payload, &signature).await;
    assert_eq!(response.status(), 401);
    let body = response_json(response).await;
    assert_eq!(body["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn staff_move_orders_through_fulfillment_states() {
    let app = TestApp::new().await;
    let (usuario_id, customer_token) = app.register_user("ana@example.com", Rol::Cliente).await;
    let (_, admin_token) = app.register_user("admin@example.com", Rol::Admin).await;
    let direccion_id = app.seed_address(usuario_id).await;
    let paquete_id = app.seed_package("Paquete Premium", dec!(299.99), 10).await;

    let payload = completed_event("cs_int_3", usuario_id, direccion_id, paquete_id);
    let signature = sign_webhook(WEBHOOK_SECRET, &payload);
    let response = app.deliver_webhook(&payload, &signature).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let pedido_id = body["pedido_id"].as_i64().unwrap();

    // Customers cannot drive fulfillment
    let response = app
        .request(
            Method::PUT,
            &format!("/api/pedidos/{}/estado", pedido_id),
            Some(&customer_token),
            Some(json!({ "estado": "Imprimiendo" })),
        )
        .await;
    assert_eq!(response.status(), 403);

    // Staff can, to any named state
    let response = app
        .request(
            Method::PUT,
            &format!("/api/pedidos/{}/estado", pedido_id),
            Some(&admin_token),
            Some(json!({ "estado": "Imprimiendo" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["estado"], "Imprimiendo");

    // Unknown states are rejected
    let response = app
        .request(
            Method::PUT,
            &format!("/api/pedidos/{}/estado", pedido_id),
            Some(&admin_token),
            Some(json!({ "estado": "Teletransportado" })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

//! HTTP API integration tests.
//!
//! Drives the real router over in-memory doubles with
//! `tower::ServiceExt::oneshot`: status codes, JSON contracts and webhook
//! signature handling.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
#![allow(clippy::too_many_lines)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use panelpay::panels::SystemResolver;
use panelpay::signature;
use panelpay::{
    AppState, CheckoutService, Gateways, Notifier, PanelService, Reconciler, WebhookSecrets,
    build_router,
};
use panelpay_core::Provider;
use panelpay_core::PaymentStatus;
use panelpay_core::environment::Clock;
use panelpay_core::gateway::GatewayError;
use panelpay_core::store::PaymentStore;
use panelpay_testing::fixtures::{ticket_payment, verification};
use panelpay_testing::{InMemoryPaymentStore, MockGateway, RecordingMailer, test_clock};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const PAYSTACK_SECRET: &str = "sk_test_paystack";
const REFERENCE: &str = "PSK-171234-ABC";

struct TestApp {
    router: Router,
    store: Arc<InMemoryPaymentStore>,
    paystack: Arc<MockGateway>,
    mailer: Arc<RecordingMailer>,
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryPaymentStore::new());
    let paystack = Arc::new(MockGateway::new(Provider::Paystack));
    let etegram = Arc::new(MockGateway::new(Provider::Etegram));
    let mailer = Arc::new(RecordingMailer::new());
    let gateways = Gateways::new(paystack.clone(), etegram);
    let clock: Arc<dyn Clock> = Arc::new(test_clock());

    let state = AppState::new(
        store.clone(),
        Reconciler::new(
            store.clone(),
            gateways.clone(),
            Notifier::new(mailer.clone(), None, "panelpay.local"),
            clock.clone(),
        ),
        CheckoutService::new(store.clone(), gateways, clock.clone(), "https://site.test"),
        PanelService::new(store.clone(), clock, Arc::new(SystemResolver)),
        WebhookSecrets {
            paystack: Some(PAYSTACK_SECRET.to_string()),
            etegram: None,
        },
        "https://site.test",
    );

    TestApp {
        router: build_router(state),
        store,
        paystack,
        mailer,
    }
}

async fn seed_purchase(app: &TestApp) {
    app.store
        .create_payment(ticket_payment(REFERENCE, 4), test_clock().now())
        .await
        .expect("seed payment");
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn webhook(uri: &str, body: &str, signature_header: Option<(&str, String)>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some((name, value)) = signature_header {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn paystack_charge(reference: &str) -> String {
    json!({
        "event": "charge.success",
        "data": { "reference": reference, "amount": 1, "status": "success" }
    })
    .to_string()
}

fn signed(body: &str) -> Option<(&'static str, String)> {
    Some((
        "x-paystack-signature",
        signature::sign(Provider::Paystack, PAYSTACK_SECRET, body.as_bytes()),
    ))
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = test_app();

    let (status, body) = send(&app.router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app.router, Request::get("/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    app.store.set_unavailable(true);
    let (status, body) = send(&app.router, Request::get("/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], false);
}

#[tokio::test]
async fn test_signed_webhook_completes_payment_once() {
    let app = test_app();
    seed_purchase(&app).await;
    app.paystack
        .respond_with(Ok(verification(REFERENCE, "success", 2_000_000)));
    let body = paystack_charge(REFERENCE);

    for _ in 0..2 {
        let (status, ack) = send(
            &app.router,
            webhook("/api/webhooks/paystack", &body, signed(&body)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["received"], true);
    }

    assert_eq!(
        app.store.payment(REFERENCE).unwrap().status,
        PaymentStatus::Completed
    );
    assert_eq!(app.store.tickets().len(), 4);
    assert_eq!(app.mailer.attempts(), 1);
    assert_eq!(app.paystack.verify_calls(), 2);
}

#[tokio::test]
async fn test_webhook_signature_is_mandatory() {
    let app = test_app();
    seed_purchase(&app).await;
    let body = paystack_charge(REFERENCE);

    let (status, error) = send(&app.router, webhook("/api/webhooks/paystack", &body, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["code"], "UNAUTHORIZED");

    let forged = Some((
        "x-paystack-signature",
        signature::sign(Provider::Paystack, "wrong-secret", body.as_bytes()),
    ));
    let (status, _) = send(&app.router, webhook("/api/webhooks/paystack", &body, forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.paystack.verify_calls(), 0);
    assert_eq!(
        app.store.payment(REFERENCE).unwrap().status,
        PaymentStatus::Pending
    );
}

#[tokio::test]
async fn test_webhook_without_secret_is_server_error() {
    let app = test_app();
    let body = json!({"reference": "ETG-171234-ABC"}).to_string();
    let header = Some((
        "x-etegram-signature",
        signature::sign(Provider::Etegram, "anything", body.as_bytes()),
    ));

    let (status, error) = send(&app.router, webhook("/api/webhooks/etegram", &body, header)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["code"], "PROVIDER_CONFIG_MISSING");
}

#[tokio::test]
async fn test_webhook_payload_handling() {
    let app = test_app();

    let transfer = json!({"event": "transfer.success", "data": {"reference": REFERENCE}}).to_string();
    let (status, ack) = send(
        &app.router,
        webhook("/api/webhooks/paystack", &transfer, signed(&transfer)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
    assert_eq!(app.paystack.verify_calls(), 0);

    let garbage = "{not json";
    let (status, _) = send(
        &app.router,
        webhook("/api/webhooks/paystack", garbage, signed(garbage)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let no_reference = json!({"event": "charge.success", "data": {}}).to_string();
    let (status, _) = send(
        &app.router,
        webhook("/api/webhooks/paystack", &no_reference, signed(&no_reference)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, info) = send(
        &app.router,
        Request::get("/api/webhooks/paystack").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(info["message"].as_str().unwrap().contains("active"));
}

#[tokio::test]
async fn test_webhook_for_unknown_reference_is_acknowledged() {
    let app = test_app();
    app.paystack.respond_with(Err(GatewayError::Rejected(
        "Transaction reference not found".to_string(),
    )));
    let body = paystack_charge("PSK-1-UNKNOWN");

    let (status, ack) = send(
        &app.router,
        webhook("/api/webhooks/paystack", &body, signed(&body)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["message"], "Payment reference not recognised");
    assert_eq!(app.paystack.verify_calls(), 0);
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn test_webhook_provider_outage_asks_for_redelivery() {
    let app = test_app();
    seed_purchase(&app).await;
    app.paystack
        .respond_with(Err(GatewayError::Unreachable(
            "connection reset".to_string(),
        )));
    let body = paystack_charge(REFERENCE);

    let (status, error) = send(
        &app.router,
        webhook("/api/webhooks/paystack", &body, signed(&body)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error["code"], "PROVIDER_UNREACHABLE");
}

#[tokio::test]
async fn test_verify_endpoint() {
    let app = test_app();
    seed_purchase(&app).await;
    app.paystack
        .respond_with(Ok(verification(REFERENCE, "success", 2_000_000)));

    let (status, body) = send(
        &app.router,
        post_json("/api/payment/verify", &json!({"reference": REFERENCE, "method": "paystack"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "success");
    assert_eq!(body["data"]["reference"], REFERENCE);
    assert_eq!(body["data"]["paymentStatus"], "COMPLETED");
    assert_eq!(body["data"]["outcome"], "applied");
}

#[tokio::test]
async fn test_verify_endpoint_errors() {
    let app = test_app();
    seed_purchase(&app).await;

    app.paystack.respond_with(Err(GatewayError::Rejected(
        "Transaction reference not found".to_string(),
    )));
    let (status, body) = send(
        &app.router,
        post_json("/api/payment/verify", &json!({"reference": "PSK-2-NOPE"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Payment reference not recognised");

    app.paystack
        .respond_with(Ok(verification(REFERENCE, "success", 1_000_000)));
    let (status, body) = send(
        &app.router,
        post_json("/api/payment/verify", &json!({"reference": REFERENCE})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "AMOUNT_MISMATCH");

    app.paystack
        .respond_with(Ok(verification("PSK-000000-OTHER", "success", 2_000_000)));
    let (status, body) = send(
        &app.router,
        post_json("/api/payment/verify", &json!({"reference": REFERENCE})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "REFERENCE_MISMATCH");
    assert!(app.store.tickets().is_empty());

    let (status, body) = send(
        &app.router,
        post_json("/api/payment/verify", &json!({"reference": "XYZ-1-A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_PROVIDER");

    let (status, body) = send(
        &app.router,
        post_json("/api/payment/verify", &json!({"reference": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_provider_redirect() {
    let app = test_app();
    seed_purchase(&app).await;
    app.paystack
        .respond_with(Ok(verification(REFERENCE, "success", 2_000_000)));

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get(format!("/api/payment/verify?reference={REFERENCE}&trxref={REFERENCE}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        "https://site.test/?payment=success&reference=PSK-171234-ABC"
    );

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/api/payment/verify?reference=nope!")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        "https://site.test/?payment=failed&reference=nope%21"
    );
}

#[tokio::test]
async fn test_ticket_checkout() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/payment/process",
            &json!({
                "sessionId": "session-9",
                "method": "paystack",
                "attendeeName": "Ada Obi",
                "attendeeEmail": "ada@example.com",
                "tickets": [{"ticketType": "regular", "quantity": 4}],
                "amount": 20000
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "paystack");
    assert_eq!(body["amount"], 20_000);
    let reference = body["reference"].as_str().unwrap();
    assert!(reference.starts_with("PSK-"));
    assert!(body["authorizationUrl"].as_str().unwrap().contains(reference));

    let stored = app.store.payment(reference).expect("pending payment");
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert_eq!(stored.amount.kobo(), 2_000_000);
    assert!(stored.metadata["request"]["userAgent"].is_string());

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/payment/process",
            &json!({
                "method": "paystack",
                "attendeeName": "Ada Obi",
                "attendeeEmail": "ada@example.com",
                "tickets": [{"ticketType": "regular", "quantity": 4}],
                "amount": 100
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_panel_registration_and_checkout() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/panels",
            &json!({
                "name": "Acme Expo",
                "subdomain": "acme",
                "ownerName": "Chidi",
                "ownerEmail": "owner@example.com",
                "ownerPhone": "08031234567"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["panel"]["ownerPhone"], "+2348031234567");
    let panel_id = body["panel"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/panels",
            &json!({
                "name": "Other",
                "subdomain": "acme",
                "ownerEmail": "other@example.com",
                "ownerPhone": "08031234567"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_SUBDOMAIN");

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/payments/initiate",
            &json!({"panelId": panel_id, "plan": "annual"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "etegram");
    assert_eq!(body["pricing"]["setupFee"], 15_000);
    assert_eq!(body["pricing"]["serviceFee"], 60_000);
    assert_eq!(body["pricing"]["total"], 75_000);
    assert!(body["reference"].as_str().unwrap().starts_with("ETG-"));

    let (status, body) = send(
        &app.router,
        Request::get(format!("/api/panels/{panel_id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payments"].as_array().unwrap().len(), 1);
    assert_eq!(body["panel"]["paymentStatus"], "PENDING");

    let (status, body) = send(
        &app.router,
        post_json("/api/check-subdomain", &json!({"subdomain": "acme"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (status, _) = send(
        &app.router,
        post_json(
            "/api/payments/initiate",
            &json!({"panelId": "00000000-0000-0000-0000-000000000000"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ticket_listing() {
    let app = test_app();
    seed_purchase(&app).await;
    app.paystack
        .respond_with(Ok(verification(REFERENCE, "success", 2_000_000)));
    send(
        &app.router,
        post_json("/api/payment/verify", &json!({"reference": REFERENCE})),
    )
    .await;

    let (status, body) = send(
        &app.router,
        Request::get("/api/tickets?page=1&limit=3&search=ADA")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["tickets"].as_array().unwrap().len(), 3);

    let (_, body) = send(
        &app.router,
        Request::get("/api/tickets?search=nobody")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body["total"], 0);
}

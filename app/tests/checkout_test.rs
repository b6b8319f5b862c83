//! Checkout service tests over in-memory doubles.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use panelpay::checkout::{CheckoutService, PanelCheckoutRequest, TicketCheckoutRequest};
use panelpay::providers::Gateways;
use panelpay_core::environment::Clock;
use panelpay_core::gateway::GatewayError;
use panelpay_core::model::PaymentPurpose;
use panelpay_core::pricing::{CartItem, PanelPlan};
use panelpay_core::store::PaymentStore;
use panelpay_core::{PanelId, PaymentError, PaymentStatus, Provider};
use panelpay_testing::fixtures::new_panel;
use panelpay_testing::{InMemoryPaymentStore, MockGateway, test_clock};
use serde_json::json;
use std::sync::Arc;

struct Harness {
    store: Arc<InMemoryPaymentStore>,
    paystack: Arc<MockGateway>,
    etegram: Arc<MockGateway>,
    checkout: CheckoutService,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryPaymentStore::new());
    let paystack = Arc::new(MockGateway::new(Provider::Paystack));
    let etegram = Arc::new(MockGateway::new(Provider::Etegram));
    let checkout = CheckoutService::new(
        store.clone(),
        Gateways::new(paystack.clone(), etegram.clone()),
        Arc::new(test_clock()),
        "https://site.test",
    );
    Harness {
        store,
        paystack,
        etegram,
        checkout,
    }
}

fn cart(method: &str) -> TicketCheckoutRequest {
    TicketCheckoutRequest {
        session_id: Some("session-1".to_string()),
        method: Some(method.to_string()),
        attendee_name: Some("Ada Obi".to_string()),
        attendee_email: Some("ada@example.com".to_string()),
        attendee_phone: Some("  ".to_string()),
        tickets: vec![
            CartItem {
                ticket_type: "vip".to_string(),
                quantity: 1,
            },
            CartItem {
                ticket_type: "regular".to_string(),
                quantity: 2,
            },
        ],
        ..TicketCheckoutRequest::default()
    }
}

#[tokio::test]
async fn test_ticket_checkout_prices_from_catalogue() {
    let h = harness();

    let checkout = h
        .checkout
        .process_tickets(cart("etegram"), json!({"clientIp": "127.0.0.1"}))
        .await
        .expect("checkout");

    assert_eq!(checkout.quote.total.naira(), 70_000);
    assert_eq!(checkout.payment.provider, Provider::Etegram);
    assert!(checkout.payment.reference.as_str().starts_with("ETG-"));
    assert_eq!(h.etegram.initialize_calls(), 1);
    assert_eq!(h.paystack.initialize_calls(), 0);

    let stored = h
        .store
        .payment(checkout.payment.reference.as_str())
        .expect("stored");
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert_eq!(stored.metadata["request"]["clientIp"], "127.0.0.1");
    match stored.purpose {
        PaymentPurpose::TicketPurchase {
            attendee, items, ..
        } => {
            assert_eq!(attendee.phone, None);
            assert_eq!(items.len(), 2);
        }
        PaymentPurpose::PanelSetup { .. } => panic!("expected a ticket purchase"),
    }
}

#[tokio::test]
async fn test_ticket_checkout_validation() {
    let h = harness();

    let mut wrong_total = cart("paystack");
    wrong_total.amount = Some(69_999.0);
    let mut bad_email = cart("paystack");
    bad_email.attendee_email = Some("not-an-email".to_string());
    let mut empty_cart = cart("paystack");
    empty_cart.tickets.clear();
    let mut unknown_type = cart("paystack");
    unknown_type.tickets[0].ticket_type = "backstage".to_string();
    let mut no_method = cart("paystack");
    no_method.method = None;

    for request in [wrong_total, bad_email, empty_cart, unknown_type, no_method] {
        let err = h
            .checkout
            .process_tickets(request, json!({}))
            .await
            .expect_err("invalid");
        assert!(matches!(err, PaymentError::Validation(_)), "{err:?}");
    }

    let err = h
        .checkout
        .process_tickets(cart("stripe"), json!({}))
        .await
        .expect_err("unknown provider");
    assert!(matches!(err, PaymentError::UnknownProvider(_)));

    assert_eq!(h.store.write_count(), 0);

    let mut exact = cart("paystack");
    exact.amount = Some(70_000.0);
    assert!(h.checkout.process_tickets(exact, json!({})).await.is_ok());
}

#[tokio::test]
async fn test_failed_initialisation_leaves_pending_row() {
    let h = harness();
    h.paystack.fail_initialize(GatewayError::ConfigMissing);

    let err = h
        .checkout
        .process_tickets(cart("paystack"), json!({}))
        .await
        .expect_err("no secret");

    assert!(matches!(
        err,
        PaymentError::ProviderConfigMissing(Provider::Paystack)
    ));
    assert_eq!(h.store.write_count(), 1);
}

#[tokio::test]
async fn test_panel_checkout() {
    let h = harness();
    let panel = h
        .store
        .create_panel(new_panel("acme"), test_clock().now())
        .await
        .expect("panel");

    let checkout = h
        .checkout
        .initiate_panel(
            PanelCheckoutRequest {
                panel_id: panel.id,
                plan: Some("weekly".to_string()),
                provider: Some("PAYSTACK".to_string()),
            },
            json!({}),
        )
        .await
        .expect("checkout");

    assert_eq!(checkout.quote.plan, PanelPlan::Monthly);
    assert_eq!(checkout.payment.amount.naira(), 20_000);
    assert_eq!(checkout.payment.provider, Provider::Paystack);
    assert_eq!(h.paystack.initialize_calls(), 1);

    let payments = h.store.payments_for_panel(panel.id).await.expect("payments");
    assert_eq!(payments.len(), 1);

    let err = h
        .checkout
        .initiate_panel(
            PanelCheckoutRequest {
                panel_id: PanelId::new(),
                plan: None,
                provider: None,
            },
            json!({}),
        )
        .await
        .expect_err("missing panel");
    assert!(matches!(err, PaymentError::NotFound { entity: "Panel", .. }));
}

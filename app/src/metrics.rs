//! Business metrics for payment reconciliation.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `panelpay_reconciliations_total{provider,outcome}` - Reconciliation calls by outcome
//! - `panelpay_amount_mismatches_total{provider}` - Successes rejected for amount
//! - `panelpay_payments_initiated_total{provider,kind}` - Checkouts opened
//! - `panelpay_tickets_issued_total` - Ticket rows written
//! - `panelpay_emails_total{result}` - Email delivery attempts
//!
//! ## Histograms
//! - `panelpay_provider_verify_duration_seconds{provider}` - Provider verify latency

use metrics::{describe_counter, describe_histogram};
use panelpay_core::Provider;
use panelpay_core::model::PaymentKind;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "panelpay_reconciliations_total",
        "Reconciliation calls by provider and outcome (applied, already_completed, superseded, unchanged, ignored, unknown_reference, error)"
    );
    describe_counter!(
        "panelpay_amount_mismatches_total",
        "Provider-reported successes rejected because the amount was outside tolerance"
    );
    describe_counter!(
        "panelpay_payments_initiated_total",
        "Pending payments created by provider and kind"
    );
    describe_counter!(
        "panelpay_tickets_issued_total",
        "Ticket rows written by completed purchases"
    );
    describe_counter!(
        "panelpay_emails_total",
        "Email delivery attempts by result (sent, failed)"
    );
    describe_histogram!(
        "panelpay_provider_verify_duration_seconds",
        "Latency of provider verification calls"
    );

    tracing::info!("Business metrics registered");
}

/// Record the outcome label of one reconciliation call.
pub fn record_reconciliation(provider: Provider, outcome: &'static str) {
    metrics::counter!(
        "panelpay_reconciliations_total",
        "provider" => provider.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    tracing::debug!(%provider, outcome, "Recorded reconciliation metric");
}

/// Record a success rejected for amount.
pub fn record_amount_mismatch(provider: Provider) {
    metrics::counter!("panelpay_amount_mismatches_total", "provider" => provider.as_str())
        .increment(1);
}

/// Record a newly created pending payment.
pub fn record_payment_initiated(provider: Provider, kind: PaymentKind) {
    metrics::counter!(
        "panelpay_payments_initiated_total",
        "provider" => provider.as_str(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record tickets written by a completed purchase.
pub fn record_tickets_issued(count: usize) {
    metrics::counter!("panelpay_tickets_issued_total").increment(count as u64);
}

/// Record an email delivery attempt.
pub fn record_email(sent: bool) {
    let result = if sent { "sent" } else { "failed" };
    metrics::counter!("panelpay_emails_total", "result" => result).increment(1);
}

/// Record the latency of a provider verify call.
pub fn record_verify_duration(provider: Provider, duration_secs: f64) {
    metrics::histogram!(
        "panelpay_provider_verify_duration_seconds",
        "provider" => provider.as_str()
    )
    .record(duration_secs);
}

//! # Panelpay Testing
//!
//! Test doubles for the environment traits defined in `panelpay-core`.
//!
//! This crate provides:
//! - [`FixedClock`] for deterministic time
//! - [`InMemoryPaymentStore`] with fault injection for atomicity tests
//! - [`MockGateway`] returning scripted provider answers
//! - [`RecordingMailer`] capturing (or failing) outbound email
//! - [`fixtures`] for common panels, attendees and purchases
//!
//! ## Example
//!
//! ```ignore
//! let store = Arc::new(InMemoryPaymentStore::new());
//! let gateway = MockGateway::new(Provider::Paystack);
//! gateway.respond_with(Ok(fixtures::verification("PSK-1-A", "success", 2_000_000)));
//! ```

use chrono::{DateTime, Utc};
use panelpay_core::environment::Clock;

pub mod fixtures;
pub mod gateway;
pub mod mailer;
pub mod store;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use panelpay_testing::mocks::FixedClock;
    /// use panelpay_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use gateway::MockGateway;
pub use mailer::RecordingMailer;
pub use mocks::{FixedClock, test_clock};
pub use store::InMemoryPaymentStore;

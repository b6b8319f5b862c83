//! Identifier and money types shared across the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a payment row
    PaymentId
);
uuid_id!(
    /// Unique identifier for a panel (tenant)
    PanelId
);
uuid_id!(
    /// Unique identifier for an issued ticket
    TicketId
);

/// Amount of money in kobo (minor units of NGN).
///
/// Stored as a signed integer so differences between two amounts can be
/// taken without wrapping. Negative amounts are rejected where they enter
/// the system (pricing and provider parsing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

/// Kobo per naira.
pub const KOBO_PER_NAIRA: i64 = 100;

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from kobo
    #[must_use]
    pub const fn from_kobo(kobo: i64) -> Self {
        Self(kobo)
    }

    /// Creates a `Money` value from whole naira, saturating on overflow
    #[must_use]
    pub const fn from_naira(naira: i64) -> Self {
        Self(naira.saturating_mul(KOBO_PER_NAIRA))
    }

    /// Returns the amount in kobo
    #[must_use]
    pub const fn kobo(&self) -> i64 {
        self.0
    }

    /// Returns the amount in whole naira (truncated)
    #[must_use]
    pub const fn naira(&self) -> i64 {
        self.0 / KOBO_PER_NAIRA
    }

    /// Adds two amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Multiplies by a quantity with overflow checking
    #[must_use]
    pub const fn checked_mul(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as i64) {
            Some(product) => Some(Self(product)),
            None => None,
        }
    }

    /// Absolute difference between two amounts
    #[must_use]
    pub const fn abs_diff(self, other: Self) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let naira = self.0 / KOBO_PER_NAIRA;
        let kobo = (self.0 % KOBO_PER_NAIRA).abs();
        if kobo == 0 {
            write!(f, "NGN {naira}")
        } else {
            write!(f, "NGN {naira}.{kobo:02}")
        }
    }
}

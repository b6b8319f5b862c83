//! Fixed price lists for panel plans and event tickets.
//!
//! Totals are plain sums of catalogue line items; there is no discounting.

use crate::types::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One-off setup fee charged with every panel plan.
pub const PANEL_SETUP_FEE: Money = Money::from_naira(15_000);

/// Maximum units of one ticket type in a single purchase.
pub const MAX_UNITS_PER_LINE: u32 = 20;

/// Pricing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// No line items were supplied.
    #[error("At least one ticket must be selected")]
    EmptyCart,

    /// The ticket type is not in the catalogue.
    #[error("Unknown ticket type: {0}")]
    UnknownTicketType(String),

    /// Quantity is zero or above the per-line limit.
    #[error("Invalid quantity {quantity} for {ticket_type}")]
    InvalidQuantity {
        /// Ticket type of the offending line
        ticket_type: String,
        /// Requested quantity
        quantity: u32,
    },

    /// Total does not fit in the money representation.
    #[error("Order total overflows")]
    Overflow,
}

/// Panel billing plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PanelPlan {
    /// Billed monthly
    #[default]
    Monthly,
    /// Billed annually
    Annual,
}

impl PanelPlan {
    /// Parse a plan name; anything other than `annual` is `monthly`.
    #[must_use]
    pub fn parse_lenient(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()) {
            Some(n) if n == "annual" || n == "yearly" => Self::Annual,
            _ => Self::Monthly,
        }
    }

    /// Lowercase plan name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Recurring service fee for the plan.
    #[must_use]
    pub const fn service_fee(&self) -> Money {
        match self {
            Self::Monthly => Money::from_naira(5_000),
            Self::Annual => Money::from_naira(60_000),
        }
    }
}

/// Breakdown of a panel checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelQuote {
    /// Selected plan
    pub plan: PanelPlan,
    /// Setup fee
    pub setup_fee: Money,
    /// Plan service fee
    pub service_fee: Money,
    /// Amount to charge
    pub total: Money,
}

/// Price a panel plan.
#[must_use]
pub const fn quote_panel(plan: PanelPlan) -> PanelQuote {
    let service_fee = plan.service_fee();
    PanelQuote {
        plan,
        setup_fee: PANEL_SETUP_FEE,
        service_fee,
        total: Money::from_kobo(PANEL_SETUP_FEE.kobo() + service_fee.kobo()),
    }
}

/// Event ticket catalogue: `(type, unit price in naira)`.
pub const TICKET_CATALOGUE: [(&str, i64); 5] = [
    ("regular", 5_000),
    ("vip", 60_000),
    ("vvip", 85_000),
    ("corporate", 250_000),
    ("premium", 850_000),
];

/// Unit price of a ticket type.
#[must_use]
pub fn ticket_price(ticket_type: &str) -> Option<Money> {
    TICKET_CATALOGUE
        .iter()
        .find(|(name, _)| *name == ticket_type)
        .map(|(_, naira)| Money::from_naira(*naira))
}

/// A requested ticket line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalogue ticket type
    pub ticket_type: String,
    /// Number of tickets
    pub quantity: u32,
}

/// A priced ticket line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Catalogue ticket type
    pub ticket_type: String,
    /// Number of tickets
    pub quantity: u32,
    /// Price of one ticket
    pub unit_price: Money,
    /// `unit_price * quantity`
    pub line_total: Money,
}

/// A priced ticket cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuote {
    /// Priced lines, in request order
    pub items: Vec<LineItem>,
    /// Sum of line totals
    pub total: Money,
}

impl CartQuote {
    /// Total number of tickets across lines.
    #[must_use]
    pub fn ticket_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Price a ticket cart.
///
/// # Errors
///
/// Returns [`PricingError`] for an empty cart, unknown ticket types,
/// out-of-range quantities, or overflow.
pub fn quote_cart(items: &[CartItem]) -> Result<CartQuote, PricingError> {
    if items.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let mut lines = Vec::with_capacity(items.len());
    let mut total = Money::ZERO;

    for item in items {
        let ticket_type = item.ticket_type.trim().to_ascii_lowercase();
        let unit_price = ticket_price(&ticket_type)
            .ok_or_else(|| PricingError::UnknownTicketType(item.ticket_type.clone()))?;

        if item.quantity == 0 || item.quantity > MAX_UNITS_PER_LINE {
            return Err(PricingError::InvalidQuantity {
                ticket_type,
                quantity: item.quantity,
            });
        }

        let line_total = unit_price
            .checked_mul(item.quantity)
            .ok_or(PricingError::Overflow)?;
        total = total.checked_add(line_total).ok_or(PricingError::Overflow)?;

        lines.push(LineItem {
            ticket_type,
            quantity: item.quantity,
            unit_price,
            line_total,
        });
    }

    Ok(CartQuote {
        items: lines,
        total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(ticket_type: &str, quantity: u32) -> CartItem {
        CartItem {
            ticket_type: ticket_type.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_panel_quotes() {
        assert_eq!(quote_panel(PanelPlan::Monthly).total, Money::from_naira(20_000));
        assert_eq!(quote_panel(PanelPlan::Annual).total, Money::from_naira(75_000));
    }

    #[test]
    fn test_unknown_plan_is_monthly() {
        assert_eq!(PanelPlan::parse_lenient(Some("weekly")), PanelPlan::Monthly);
        assert_eq!(PanelPlan::parse_lenient(None), PanelPlan::Monthly);
        assert_eq!(PanelPlan::parse_lenient(Some("Annual")), PanelPlan::Annual);
    }

    #[test]
    fn test_cart_total() {
        let quote = quote_cart(&[item("regular", 4), item("VIP", 1)]).unwrap();
        assert_eq!(quote.total, Money::from_naira(80_000));
        assert_eq!(quote.ticket_count(), 5);
        assert_eq!(quote.items[1].ticket_type, "vip");
    }

    #[test]
    fn test_cart_rejections() {
        assert_eq!(quote_cart(&[]), Err(PricingError::EmptyCart));
        assert!(matches!(
            quote_cart(&[item("backstage", 1)]),
            Err(PricingError::UnknownTicketType(_))
        ));
        assert!(matches!(
            quote_cart(&[item("regular", 0)]),
            Err(PricingError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            quote_cart(&[item("regular", 21)]),
            Err(PricingError::InvalidQuantity { .. })
        ));
    }
}

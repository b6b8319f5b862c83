//! Confirmation email bodies.

use panelpay_core::model::{Attendee, Panel, PaymentPurpose, PaymentRecord, Ticket};
use panelpay_core::notify::EmailMessage;
use panelpay_core::pricing::quote_panel;
use std::fmt::Write as _;

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #16a34a;">{title}</h2>
{content}
        <p style="color: #666; font-size: 12px; margin-top: 40px;">
            Keep this email as your receipt.
        </p>
    </div>
</body>
</html>"#
    )
}

/// Receipt for a panel owner whose setup payment completed.
#[must_use]
pub fn panel_confirmation(panel: &Panel, record: &PaymentRecord, panel_url: &str) -> EmailMessage {
    let greeting = panel.owner_name.as_deref().unwrap_or("there");
    let plan = match &record.purpose {
        PaymentPurpose::PanelSetup { plan, .. } => Some(quote_panel(*plan)),
        PaymentPurpose::TicketPurchase { .. } => None,
    };

    let mut rows = String::new();
    if let Some(quote) = &plan {
        let _ = write!(
            rows,
            "<tr><td>Setup fee</td><td>{}</td></tr><tr><td>Service fee ({})</td><td>{}</td></tr>",
            quote.setup_fee,
            quote.plan.as_str(),
            quote.service_fee
        );
    }

    let content = format!(
        r#"        <p>Hi {name},</p>
        <p>Your payment for <strong>{panel}</strong> has been confirmed and your panel is now active.</p>
        <table style="border-collapse: collapse; margin: 20px 0;">{rows}<tr><td><strong>Total</strong></td><td><strong>{total}</strong></td></tr></table>
        <p>Reference: <code>{reference}</code></p>
        <p><a href="{url}" style="display: inline-block; background-color: #16a34a; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">Open your panel</a></p>"#,
        name = escape(greeting),
        panel = escape(&panel.name),
        total = record.amount,
        reference = record.reference,
        url = escape(panel_url),
    );

    EmailMessage {
        to: panel.owner_email.clone(),
        subject: format!("Payment confirmed: {}", panel.name),
        html: layout("Payment confirmed", &content),
        text: format!(
            "Hi {greeting},\n\nYour payment of {} for {} has been confirmed.\nReference: {}\nPanel: {panel_url}\n",
            record.amount, panel.name, record.reference
        ),
    }
}

/// Notice to the operator that a panel was paid for.
#[must_use]
pub fn panel_admin_notice(panel: &Panel, record: &PaymentRecord, admin_email: &str) -> EmailMessage {
    let owner = panel.owner_name.as_deref().unwrap_or("-");
    let content = format!(
        r"        <p>A panel setup payment was completed.</p>
        <ul>
            <li>Panel: {panel} ({subdomain})</li>
            <li>Owner: {owner}</li>
            <li>Email: {email}</li>
            <li>Phone: {phone}</li>
            <li>Amount: {amount} via {provider}</li>
            <li>Reference: {reference}</li>
        </ul>",
        panel = escape(&panel.name),
        subdomain = escape(&panel.subdomain),
        owner = escape(owner),
        email = escape(&panel.owner_email),
        phone = escape(&panel.owner_phone),
        amount = record.amount,
        provider = record.provider,
        reference = record.reference,
    );

    EmailMessage {
        to: admin_email.to_string(),
        subject: format!("New panel payment: {}", panel.subdomain),
        html: layout("New panel payment", &content),
        text: format!(
            "Panel {} ({}) paid {} via {}.\nOwner: {owner} <{}> {}\nReference: {}\n",
            panel.name,
            panel.subdomain,
            record.amount,
            record.provider,
            panel.owner_email,
            panel.owner_phone,
            record.reference
        ),
    }
}

/// Receipt for a ticket buyer listing every issued ticket.
#[must_use]
pub fn ticket_confirmation(
    attendee: &Attendee,
    record: &PaymentRecord,
    tickets: &[Ticket],
) -> EmailMessage {
    let mut rows = String::new();
    let mut lines = String::new();
    for ticket in tickets {
        let _ = write!(
            rows,
            "<tr><td><code>{}</code></td><td>{}</td><td>{}</td></tr>",
            escape(&ticket.code),
            escape(&ticket.ticket_type),
            ticket.price
        );
        let _ = writeln!(lines, "- {} ({}) {}", ticket.code, ticket.ticket_type, ticket.price);
    }

    let content = format!(
        r#"        <p>Hi {name},</p>
        <p>Your payment has been confirmed. Here are your tickets:</p>
        <table style="border-collapse: collapse; margin: 20px 0;">
            <tr><th align="left">Code</th><th align="left">Type</th><th align="left">Price</th></tr>
            {rows}
            <tr><td colspan="2"><strong>Total</strong></td><td><strong>{total}</strong></td></tr>
        </table>
        <p>Reference: <code>{reference}</code></p>"#,
        name = escape(&attendee.name),
        total = record.amount,
        reference = record.reference,
    );

    EmailMessage {
        to: attendee.email.clone(),
        subject: format!("Your tickets ({})", record.reference),
        html: layout("Your tickets are confirmed", &content),
        text: format!(
            "Hi {},\n\nYour payment of {} has been confirmed.\n{lines}Reference: {}\n",
            attendee.name,
            record.amount,
            record.reference
        ),
    }
}

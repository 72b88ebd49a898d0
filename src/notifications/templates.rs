use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Rendered message bodies for one event. Email gets the long form; SMS and
/// WhatsApp get the short form.
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub subject: String,
    pub email_body: String,
    pub short_body: String,
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d-%b-%Y %H:%M").to_string()
}

pub fn invoice_created(
    sender: &str,
    invoice_no: &str,
    customer_name: &str,
    payable_amount: Decimal,
    date: DateTime<Utc>,
    invoice_link: &str,
) -> RenderedMessage {
    let date = format_date(date);
    RenderedMessage {
        subject: format!("Invoice {invoice_no} from {sender}"),
        email_body: format!(
            "Dear {customer_name},\n\n\
             Invoice {invoice_no} was created on {date}.\n\
             Amount payable: {payable_amount}\n\n\
             View it here: {invoice_link}\n\n\
             Regards,\n{sender}"
        ),
        short_body: format!(
            "{sender}: invoice {invoice_no} for {payable_amount} created on {date}. {invoice_link}"
        ),
    }
}

pub fn payment_confirmed(
    sender: &str,
    invoice_no: &str,
    customer_name: &str,
    amount: Decimal,
    method: &str,
    reference: &str,
    payment_status: &str,
) -> RenderedMessage {
    let reference = if reference.is_empty() { "N/A" } else { reference };
    let date = format_date(Utc::now());
    RenderedMessage {
        subject: format!("Payment received for invoice {invoice_no}"),
        email_body: format!(
            "Dear {customer_name},\n\n\
             We received {amount} via {method} (ref: {reference}) on {date} \
             against invoice {invoice_no}.\n\
             Payment status: {payment_status}\n\n\
             Regards,\n{sender}"
        ),
        short_body: format!(
            "{sender}: payment of {amount} via {method} received for invoice {invoice_no} ({payment_status})."
        ),
    }
}

pub fn low_stock(
    sender: &str,
    item_name: &str,
    sku: &str,
    unit: &str,
    current_qty: Decimal,
    threshold: Decimal,
) -> RenderedMessage {
    RenderedMessage {
        subject: format!("Low stock alert: {item_name} ({sku})"),
        email_body: format!(
            "{item_name} ({sku}) is down to {current_qty} {unit}, at or below the \
             threshold of {threshold} {unit}. Restock soon.\n\n{sender}"
        ),
        short_body: format!(
            "{sender}: low stock for {item_name} ({sku}) - {current_qty} {unit} left."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn invoice_created_mentions_number_and_amount() {
        let msg = invoice_created(
            "Shop",
            "42",
            "Acme Traders",
            Decimal::from_str("219.50").unwrap(),
            Utc::now(),
            "http://localhost:3000/api/billing/abc",
        );
        assert!(msg.subject.contains("42"));
        assert!(msg.email_body.contains("Acme Traders"));
        assert!(msg.email_body.contains("219.50"));
        assert!(msg.short_body.contains("http://localhost:3000/api/billing/abc"));
    }

    #[test]
    fn payment_confirmed_defaults_missing_reference() {
        let msg = payment_confirmed("Shop", "42", "Acme", Decimal::from(100), "cash", "", "paid");
        assert!(msg.email_body.contains("ref: N/A"));
        assert!(msg.short_body.contains("paid"));
    }

    #[test]
    fn low_stock_carries_quantities() {
        let msg = low_stock("Shop", "Copper Wire", "CW-001", "meter", Decimal::from(3), Decimal::from(5));
        assert!(msg.subject.contains("CW-001"));
        assert!(msg.email_body.contains('3'));
        assert!(msg.email_body.contains('5'));
    }
}

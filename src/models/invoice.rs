use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PARTIAL: &str = "partial";
pub const STATUS_PAID: &str = "paid";

/// Invoice joined with its customer name for list and detail views.
#[derive(Debug, Serialize, FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub invoice_no: String,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub gst_amount: Decimal,
    pub discount: Decimal,
    pub payment_status: String,
    pub paid_amount: Decimal,
    pub payment_method: String,
    pub payment_reference: String,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct InvoiceItemRow {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub item_sku: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub gst_percent: Decimal,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: InvoiceRow,
    pub payable_amount: Decimal,
    pub items: Vec<InvoiceItemRow>,
}

impl InvoiceResponse {
    pub fn new(invoice: InvoiceRow, items: Vec<InvoiceItemRow>) -> Self {
        let payable_amount = payable_amount(invoice.total_amount, invoice.gst_amount, invoice.discount);
        Self {
            invoice,
            payable_amount,
            items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoice {
    pub customer: Option<Uuid>,
    #[serde(default)]
    pub discount: Decimal,
    pub items: Vec<CreateInvoiceLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceLine {
    pub item: Uuid,
    pub quantity: Decimal,
    /// Snapshot overrides; default to the catalog values when omitted.
    pub price: Option<Decimal>,
    pub gst_percent: Option<Decimal>,
}

impl CreateInvoice {
    pub fn validate(&self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("At least one line item is required.".to_string());
        }
        if self.discount < Decimal::ZERO {
            return Err("Discount cannot be negative.".to_string());
        }
        for line in &self.items {
            if line.quantity <= Decimal::ZERO {
                return Err("Quantity must be positive.".to_string());
            }
            if let Some(price) = line.price {
                if price < Decimal::ZERO {
                    return Err("Price cannot be negative.".to_string());
                }
            }
            if let Some(gst) = line.gst_percent {
                if gst < Decimal::ZERO || gst > Decimal::from(100) {
                    return Err("GST percent must be between 0 and 100.".to_string());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentPayload {
    pub amount: Decimal,
    pub method: String,
    #[serde(default)]
    pub reference: String,
}

impl PaymentPayload {
    pub fn validate(&self) -> Result<(), String> {
        if self.amount <= Decimal::ZERO {
            return Err("Amount must be greater than zero.".to_string());
        }
        if self.method.trim().is_empty() {
            return Err("Payment method is required.".to_string());
        }
        Ok(())
    }
}

pub fn line_total(price: Decimal, quantity: Decimal) -> Decimal {
    price * quantity
}

pub fn line_gst(price: Decimal, quantity: Decimal, gst_percent: Decimal) -> Decimal {
    line_total(price, quantity) * gst_percent / Decimal::from(100)
}

pub fn payable_amount(total: Decimal, gst: Decimal, discount: Decimal) -> Decimal {
    total + gst - discount
}

/// A payment covering the full due amount settles the invoice; anything less
/// leaves it partial.
pub fn payment_status_for(amount: Decimal, due: Decimal) -> &'static str {
    if amount >= due {
        STATUS_PAID
    } else {
        STATUS_PARTIAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn one_line() -> CreateInvoice {
        CreateInvoice {
            customer: None,
            discount: Decimal::ZERO,
            items: vec![CreateInvoiceLine {
                item: Uuid::new_v4(),
                quantity: Decimal::from(2),
                price: Some(dec("99.50")),
                gst_percent: Some(Decimal::from(18)),
            }],
        }
    }

    #[test]
    fn line_math() {
        assert_eq!(line_total(dec("99.50"), Decimal::from(2)), dec("199.00"));
        assert_eq!(line_gst(dec("100"), Decimal::from(2), Decimal::from(18)), dec("36"));
    }

    #[test]
    fn payable_subtracts_discount() {
        assert_eq!(payable_amount(dec("200"), dec("36"), dec("16")), dec("220"));
    }

    #[test]
    fn payment_status_derivation() {
        assert_eq!(payment_status_for(dec("220"), dec("220")), STATUS_PAID);
        assert_eq!(payment_status_for(dec("250"), dec("220")), STATUS_PAID);
        assert_eq!(payment_status_for(dec("100"), dec("220")), STATUS_PARTIAL);
    }

    #[test]
    fn create_requires_lines() {
        let mut payload = one_line();
        payload.items.clear();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn create_rejects_negative_discount_and_bad_lines() {
        let mut payload = one_line();
        payload.discount = Decimal::from(-1);
        assert!(payload.validate().is_err());

        let mut payload = one_line();
        payload.items[0].quantity = Decimal::ZERO;
        assert!(payload.validate().is_err());

        let mut payload = one_line();
        payload.items[0].price = Some(Decimal::from(-5));
        assert!(payload.validate().is_err());

        let mut payload = one_line();
        payload.items[0].gst_percent = Some(Decimal::from(120));
        assert!(payload.validate().is_err());
    }

    #[test]
    fn payment_payload_validation() {
        let payment = PaymentPayload {
            amount: dec("10"),
            method: "cash".into(),
            reference: String::new(),
        };
        assert!(payment.validate().is_ok());

        let payment = PaymentPayload {
            amount: Decimal::ZERO,
            method: "cash".into(),
            reference: String::new(),
        };
        assert!(payment.validate().is_err());

        let payment = PaymentPayload {
            amount: dec("10"),
            method: "  ".into(),
            reference: String::new(),
        };
        assert!(payment.validate().is_err());
    }
}

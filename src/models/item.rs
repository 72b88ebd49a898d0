use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const UNITS: [&str; 3] = ["pcs", "kg", "meter"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub brand: String,
    pub price: Decimal,
    pub gst_percent: Decimal,
    // Cached ledger totals; always re-derivable from stock_transactions.
    pub total_in_stock: Decimal,
    pub total_out_stock: Decimal,
    pub current_stock: Decimal,
    pub low_stock_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ItemPayload {
    pub name: String,
    pub sku: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub gst_percent: Decimal,
}

fn default_unit() -> String {
    "pcs".to_string()
}

impl ItemPayload {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required.".to_string());
        }
        if self.sku.trim().is_empty() {
            return Err("SKU is required.".to_string());
        }
        if !UNITS.contains(&self.unit.as_str()) {
            return Err(format!("Unit must be one of: {}.", UNITS.join(", ")));
        }
        if self.price < Decimal::ZERO {
            return Err("Price cannot be negative.".to_string());
        }
        if self.gst_percent < Decimal::ZERO || self.gst_percent > Decimal::from(100) {
            return Err("GST percent must be between 0 and 100.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn payload() -> ItemPayload {
        ItemPayload {
            name: "Copper Wire".into(),
            sku: "CW-001".into(),
            unit: "meter".into(),
            brand: "".into(),
            price: Decimal::from_str("12.50").unwrap(),
            gst_percent: Decimal::from(18),
        }
    }

    #[test]
    fn accepts_valid_item() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn rejects_blank_name_and_sku() {
        let mut p = payload();
        p.name = "  ".into();
        assert!(p.validate().is_err());

        let mut p = payload();
        p.sku = "".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_unknown_unit() {
        let mut p = payload();
        p.unit = "litre".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_amounts() {
        let mut p = payload();
        p.price = Decimal::from(-1);
        assert!(p.validate().is_err());

        let mut p = payload();
        p.gst_percent = Decimal::from(101);
        assert!(p.validate().is_err());
    }
}

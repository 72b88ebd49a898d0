use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const TXN_IN: &str = "IN";
pub const TXN_OUT: &str = "OUT";

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct StockTransaction {
    pub id: Uuid,
    pub item_id: Uuid,
    pub txn_type: String,
    pub quantity: Decimal,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Ledger row joined with the item it belongs to, as returned by list views.
#[derive(Debug, Serialize, FromRow)]
pub struct StockTransactionRow {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub item_sku: String,
    pub txn_type: String,
    pub quantity: Decimal,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStockTransaction {
    pub item: Uuid,
    pub txn_type: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub note: String,
}

impl CreateStockTransaction {
    pub fn validate(&self) -> Result<(), String> {
        if self.txn_type != TXN_IN && self.txn_type != TXN_OUT {
            return Err("Transaction type must be IN or OUT.".to_string());
        }
        if self.quantity <= Decimal::ZERO {
            return Err("Quantity must be greater than zero.".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct StockTransactionFilter {
    pub item: Option<Uuid>,
    pub txn_type: Option<String>,
    pub limit: Option<i64>,
}

/// Per-item totals derived straight from the ledger.
#[derive(Debug, FromRow)]
pub struct StockAggregateRow {
    pub item_id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub total_in: Decimal,
    pub total_out: Decimal,
}

#[derive(Debug, Serialize)]
pub struct StockReportEntry {
    pub item_id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub current_stock: Decimal,
    pub is_low_stock: bool,
}

impl StockReportEntry {
    pub fn from_aggregate(row: StockAggregateRow, threshold: Decimal) -> Self {
        let current_stock = row.total_in - row.total_out;
        Self {
            item_id: row.item_id,
            name: row.name,
            sku: row.sku,
            unit: row.unit,
            total_in: row.total_in,
            total_out: row.total_out,
            current_stock,
            is_low_stock: current_stock <= threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(txn_type: &str, quantity: i64) -> CreateStockTransaction {
        CreateStockTransaction {
            item: Uuid::new_v4(),
            txn_type: txn_type.into(),
            quantity: Decimal::from(quantity),
            note: String::new(),
        }
    }

    #[test]
    fn accepts_in_and_out() {
        assert!(txn(TXN_IN, 5).validate().is_ok());
        assert!(txn(TXN_OUT, 5).validate().is_ok());
    }

    #[test]
    fn rejects_unknown_type_and_non_positive_quantity() {
        assert!(txn("TRANSFER", 5).validate().is_err());
        assert!(txn(TXN_IN, 0).validate().is_err());
        assert!(txn(TXN_IN, -3).validate().is_err());
    }

    #[test]
    fn report_entry_derives_current_and_low_stock() {
        let row = StockAggregateRow {
            item_id: Uuid::new_v4(),
            name: "Bolt".into(),
            sku: "B-1".into(),
            unit: "pcs".into(),
            total_in: Decimal::from(10),
            total_out: Decimal::from(7),
        };
        let entry = StockReportEntry::from_aggregate(row, Decimal::from(5));
        assert_eq!(entry.current_stock, Decimal::from(3));
        assert!(entry.is_low_stock);
    }
}

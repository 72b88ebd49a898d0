use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerPayload {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl CustomerPayload {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required.".to_string());
        }
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err("Email is not valid.".to_string());
            }
        }
        Ok(())
    }
}

/// Directory row with billing totals, used by the CSV export.
#[derive(Debug, FromRow)]
pub struct CustomerExportRow {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub invoice_count: i64,
    pub lifetime_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_customer() {
        let payload = CustomerPayload {
            name: "Acme Traders".into(),
            phone: String::new(),
            email: None,
            address: None,
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn rejects_blank_name_and_bad_email() {
        let payload = CustomerPayload {
            name: " ".into(),
            phone: String::new(),
            email: None,
            address: None,
        };
        assert!(payload.validate().is_err());

        let payload = CustomerPayload {
            name: "Acme".into(),
            phone: String::new(),
            email: Some("not-an-email".into()),
            address: None,
        };
        assert!(payload.validate().is_err());
    }
}

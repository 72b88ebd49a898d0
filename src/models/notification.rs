use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const EVENT_INVOICE_CREATED: &str = "invoice_created";
pub const EVENT_PAYMENT_CONFIRMED: &str = "payment_confirmed";
pub const EVENT_LOW_STOCK: &str = "low_stock";

pub const CHANNEL_EMAIL: &str = "email";
pub const CHANNEL_SMS: &str = "sms";
pub const CHANNEL_WHATSAPP: &str = "whatsapp";

pub const STATUS_SENT: &str = "sent";
pub const STATUS_FAILED: &str = "failed";

/// Append-only audit trail of every dispatch attempt and its outcome.
#[derive(Debug, Serialize, FromRow)]
pub struct NotificationLog {
    pub id: Uuid,
    pub event: String,
    pub channel: String,
    pub recipient: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub error: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationLogFilter {
    pub event: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

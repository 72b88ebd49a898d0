use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{0} is not valid: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub sender_name: String,
    /// Base URL used for links in outbound messages.
    pub base_url: String,
    pub low_stock_threshold: Decimal,
    pub admin_emails: Vec<String>,
    pub smtp: Option<SmtpConfig>,
    pub twilio: Option<TwilioConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub sms_from: Option<String>,
    pub whatsapp_from: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let port = match env::var("PORT") {
            Ok(raw) => u16::from_str(&raw).map_err(|e| ConfigError::Invalid("PORT", e.to_string()))?,
            Err(_) => 3000,
        };

        Ok(Self {
            database_url,
            port,
            jwt_secret,
            notifications: NotificationConfig::from_env(),
        })
    }
}

impl NotificationConfig {
    fn from_env() -> Self {
        let smtp = match (
            env::var("SMTP_HOST"),
            env::var("SMTP_USERNAME"),
            env::var("SMTP_PASSWORD"),
        ) {
            (Ok(host), Ok(username), Ok(password)) => Some(SmtpConfig {
                host,
                port: env_u16("SMTP_PORT", 587),
                from_email: env::var("SMTP_FROM_EMAIL").unwrap_or_else(|_| username.clone()),
                username,
                password,
            }),
            _ => None,
        };

        let twilio = match (env::var("TWILIO_ACCOUNT_SID"), env::var("TWILIO_AUTH_TOKEN")) {
            (Ok(account_sid), Ok(auth_token)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                sms_from: env::var("TWILIO_SMS_FROM").ok(),
                whatsapp_from: env::var("TWILIO_WHATSAPP_FROM").ok(),
            }),
            _ => None,
        };

        Self {
            sender_name: env::var("SENDER_NAME")
                .unwrap_or_else(|_| "Inventory & Billing System".to_string()),
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            low_stock_threshold: parse_threshold(env::var("LOW_STOCK_THRESHOLD").ok().as_deref()),
            admin_emails: split_emails(env::var("ADMIN_EMAILS").ok().as_deref()),
            smtp,
            twilio,
        }
    }
}

fn env_u16(key: &str, default: u16) -> u16 {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Malformed thresholds fall back to 5 rather than refusing to boot.
pub fn parse_threshold(raw: Option<&str>) -> Decimal {
    raw.and_then(|v| Decimal::from_str(v.trim()).ok())
        .unwrap_or_else(|| Decimal::from(5))
}

pub fn split_emails(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_parses_or_defaults() {
        assert_eq!(parse_threshold(Some("12.5")), Decimal::from_str("12.5").unwrap());
        assert_eq!(parse_threshold(Some(" 3 ")), Decimal::from(3));
        assert_eq!(parse_threshold(Some("not-a-number")), Decimal::from(5));
        assert_eq!(parse_threshold(None), Decimal::from(5));
    }

    #[test]
    fn admin_emails_are_trimmed_and_filtered() {
        let emails = split_emails(Some("ops@example.com, , billing@example.com ,"));
        assert_eq!(emails, vec!["ops@example.com", "billing@example.com"]);
        assert!(split_emails(None).is_empty());
    }
}

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::{SmtpConfig, TwilioConfig};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SendError(pub String);

#[async_trait]
pub trait Provider: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError>;
}

#[derive(Clone)]
pub struct EmailProvider {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
}

impl EmailProvider {
    pub fn new(config: &SmtpConfig) -> Result<Self, SendError> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| SendError(format!("smtp relay setup failed: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
        })
    }
}

#[async_trait]
impl Provider for EmailProvider {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e| SendError(format!("invalid from address: {e}")))?,
            )
            .to(recipient
                .parse()
                .map_err(|e| SendError(format!("invalid recipient address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SendError(format!("failed to build message: {e}")))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| SendError(format!("smtp send failed: {e}")))?;

        Ok(())
    }
}

/// SMS and WhatsApp delivery through the Twilio messages API.
pub struct TwilioProvider {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    whatsapp: bool,
}

impl TwilioProvider {
    pub fn new(
        http: reqwest::Client,
        config: &TwilioConfig,
        from_number: String,
        whatsapp: bool,
    ) -> Self {
        Self {
            http,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number,
            whatsapp,
        }
    }
}

pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{number}")
    }
}

#[async_trait]
impl Provider for TwilioProvider {
    async fn send(&self, recipient: &str, _subject: &str, body: &str) -> Result<(), SendError> {
        let (from, to) = if self.whatsapp {
            (whatsapp_address(&self.from_number), whatsapp_address(recipient))
        } else {
            (self.from_number.clone(), recipient.to_string())
        };

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", from.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| SendError(format!("twilio request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(SendError(format!("twilio returned {status}: {detail}")));
        }

        Ok(())
    }
}

/// Fallback when a channel has no configured provider: the message only lands
/// in the application log and the notification audit trail.
pub struct ConsoleProvider {
    pub channel: String,
}

#[async_trait]
impl Provider for ConsoleProvider {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError> {
        log::info!(
            "console notification ({}) -> {recipient}: {subject}\n{body}",
            self.channel
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatsapp_prefix_is_idempotent() {
        assert_eq!(whatsapp_address("+15551234"), "whatsapp:+15551234");
        assert_eq!(whatsapp_address("whatsapp:+15551234"), "whatsapp:+15551234");
    }
}

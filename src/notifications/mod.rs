//! Outbound notification dispatch. Every attempt, successful or not, is
//! appended to `notification_log`; provider failures never bubble up into the
//! request that triggered them.

pub mod providers;
pub mod templates;

use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::database::Database;
use crate::models::notification::{
    CHANNEL_EMAIL, CHANNEL_SMS, CHANNEL_WHATSAPP, EVENT_INVOICE_CREATED, EVENT_LOW_STOCK,
    EVENT_PAYMENT_CONFIRMED, STATUS_FAILED, STATUS_SENT,
};
use crate::models::{InvoiceRow, Item};
use providers::{ConsoleProvider, EmailProvider, Provider, TwilioProvider};
use templates::RenderedMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub channel: String,
    pub address: String,
}

impl Recipient {
    pub fn email(address: impl Into<String>) -> Self {
        Self {
            channel: CHANNEL_EMAIL.to_string(),
            address: address.into(),
        }
    }

    pub fn sms(address: impl Into<String>) -> Self {
        Self {
            channel: CHANNEL_SMS.to_string(),
            address: address.into(),
        }
    }

    pub fn whatsapp(address: impl Into<String>) -> Self {
        Self {
            channel: CHANNEL_WHATSAPP.to_string(),
            address: address.into(),
        }
    }
}

/// Contact fields on the customer row, as far as dispatch cares.
#[derive(Debug, Default, sqlx::FromRow)]
pub struct CustomerContact {
    pub email: Option<String>,
    pub phone: String,
}

/// Which message channels have a configured sender.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelSet {
    pub sms: bool,
    pub whatsapp: bool,
}

/// Customer contact details when present, admin contacts otherwise. The phone
/// number only becomes a recipient on channels that have a sender configured.
pub fn resolve_recipients(
    contact: Option<&CustomerContact>,
    admin_emails: &[String],
    channels: ChannelSet,
) -> Vec<Recipient> {
    let mut recipients = Vec::new();

    if let Some(contact) = contact {
        if let Some(email) = contact.email.as_deref() {
            if !email.trim().is_empty() {
                recipients.push(Recipient::email(email.trim()));
            }
        }
        let phone = contact.phone.trim();
        if !phone.is_empty() {
            if channels.sms {
                recipients.push(Recipient::sms(phone));
            }
            if channels.whatsapp {
                recipients.push(Recipient::whatsapp(phone));
            }
        }
    }

    if recipients.is_empty() {
        return admin_recipients(admin_emails);
    }
    recipients
}

pub fn admin_recipients(admin_emails: &[String]) -> Vec<Recipient> {
    admin_emails.iter().map(Recipient::email).collect()
}

pub struct Notifier {
    config: NotificationConfig,
    mailer: Option<EmailProvider>,
    http: reqwest::Client,
}

impl Notifier {
    pub fn new(config: NotificationConfig) -> Self {
        let mailer = match &config.smtp {
            Some(smtp) => match EmailProvider::new(smtp) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    log::warn!("smtp disabled, falling back to console: {e}");
                    None
                }
            },
            None => None,
        };

        Self {
            config,
            mailer,
            http: reqwest::Client::new(),
        }
    }

    fn channels(&self) -> ChannelSet {
        match &self.config.twilio {
            Some(twilio) => ChannelSet {
                sms: twilio.sms_from.is_some(),
                whatsapp: twilio.whatsapp_from.is_some(),
            },
            None => ChannelSet::default(),
        }
    }

    fn provider_for(&self, channel: &str) -> Box<dyn Provider> {
        match channel {
            CHANNEL_EMAIL => {
                if let Some(mailer) = &self.mailer {
                    return Box::new(mailer.clone());
                }
            }
            CHANNEL_SMS => {
                if let Some(twilio) = &self.config.twilio {
                    if let Some(from) = &twilio.sms_from {
                        return Box::new(TwilioProvider::new(
                            self.http.clone(),
                            twilio,
                            from.clone(),
                            false,
                        ));
                    }
                }
            }
            CHANNEL_WHATSAPP => {
                if let Some(twilio) = &self.config.twilio {
                    if let Some(from) = &twilio.whatsapp_from {
                        return Box::new(TwilioProvider::new(
                            self.http.clone(),
                            twilio,
                            from.clone(),
                            true,
                        ));
                    }
                }
            }
            _ => {}
        }

        Box::new(ConsoleProvider {
            channel: channel.to_string(),
        })
    }

    pub async fn invoice_created(
        &self,
        db: &Database,
        invoice: &InvoiceRow,
        payable_amount: Decimal,
    ) {
        let customer_name = invoice.customer_name.as_deref().unwrap_or("Customer");
        let link = format!("{}/api/billing/{}", self.config.base_url, invoice.id);
        let message = templates::invoice_created(
            &self.config.sender_name,
            &invoice.invoice_no,
            customer_name,
            payable_amount,
            invoice.date,
            &link,
        );

        let contact = self.customer_contact(db, invoice.customer_id).await;
        let recipients =
            resolve_recipients(contact.as_ref(), &self.config.admin_emails, self.channels());

        self.dispatch(
            db,
            EVENT_INVOICE_CREATED,
            recipients,
            message,
            json!({ "invoice_id": invoice.id }),
        )
        .await;
    }

    pub async fn payment_confirmed(
        &self,
        db: &Database,
        invoice: &InvoiceRow,
        amount: Decimal,
        method: &str,
        reference: &str,
    ) {
        let customer_name = invoice.customer_name.as_deref().unwrap_or("Customer");
        let message = templates::payment_confirmed(
            &self.config.sender_name,
            &invoice.invoice_no,
            customer_name,
            amount,
            method,
            reference,
            &invoice.payment_status,
        );

        let contact = self.customer_contact(db, invoice.customer_id).await;
        let recipients =
            resolve_recipients(contact.as_ref(), &self.config.admin_emails, self.channels());

        self.dispatch(
            db,
            EVENT_PAYMENT_CONFIRMED,
            recipients,
            message,
            json!({ "invoice_id": invoice.id }),
        )
        .await;
    }

    pub async fn low_stock(&self, db: &Database, item: &Item, current_qty: Decimal) {
        let message = templates::low_stock(
            &self.config.sender_name,
            &item.name,
            &item.sku,
            &item.unit,
            current_qty,
            self.config.low_stock_threshold,
        );

        let recipients = admin_recipients(&self.config.admin_emails);

        self.dispatch(
            db,
            EVENT_LOW_STOCK,
            recipients,
            message,
            json!({ "item_id": item.id }),
        )
        .await;
    }

    async fn customer_contact(
        &self,
        db: &Database,
        customer_id: Option<Uuid>,
    ) -> Option<CustomerContact> {
        let customer_id = customer_id?;
        sqlx::query_as::<_, CustomerContact>("SELECT email, phone FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(db)
            .await
            .ok()
            .flatten()
    }

    async fn dispatch(
        &self,
        db: &Database,
        event: &str,
        recipients: Vec<Recipient>,
        message: RenderedMessage,
        metadata: serde_json::Value,
    ) {
        if recipients.is_empty() {
            log::warn!("no recipients for event {event}");
            return;
        }

        for recipient in recipients {
            let provider = self.provider_for(&recipient.channel);
            let body = if recipient.channel == CHANNEL_EMAIL {
                &message.email_body
            } else {
                &message.short_body
            };

            let (status, error) = match provider
                .send(&recipient.address, &message.subject, body)
                .await
            {
                Ok(()) => {
                    log::info!("notification sent: {event} -> {}:{}", recipient.channel, recipient.address);
                    (STATUS_SENT, String::new())
                }
                Err(e) => {
                    log::error!(
                        "notification failed: {event} -> {}:{}: {e}",
                        recipient.channel,
                        recipient.address
                    );
                    (STATUS_FAILED, e.to_string())
                }
            };

            let logged = sqlx::query(
                r#"
                INSERT INTO notification_log (event, channel, recipient, subject, message, status, error, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event)
            .bind(&recipient.channel)
            .bind(&recipient.address)
            .bind(&message.subject)
            .bind(body)
            .bind(status)
            .bind(&error)
            .bind(&metadata)
            .execute(db)
            .await;

            if let Err(e) = logged {
                log::error!("failed to record notification log entry: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(email: Option<&str>, phone: &str) -> CustomerContact {
        CustomerContact {
            email: email.map(str::to_string),
            phone: phone.to_string(),
        }
    }

    #[test]
    fn customer_email_wins_over_admins() {
        let admins = vec!["ops@example.com".to_string()];
        let c = contact(Some("buyer@example.com"), "");
        let recipients = resolve_recipients(Some(&c), &admins, ChannelSet::default());
        assert_eq!(recipients, vec![Recipient::email("buyer@example.com")]);
    }

    #[test]
    fn blank_customer_contact_falls_back_to_admins() {
        let admins = vec!["ops@example.com".to_string(), "billing@example.com".to_string()];
        let c = contact(Some("  "), " ");
        let recipients = resolve_recipients(Some(&c), &admins, ChannelSet::default());
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0], Recipient::email("ops@example.com"));

        let recipients = resolve_recipients(None, &admins, ChannelSet::default());
        assert_eq!(recipients.len(), 2);
    }

    #[test]
    fn phone_routes_to_configured_channels_only() {
        let admins = vec!["ops@example.com".to_string()];
        let c = contact(Some("buyer@example.com"), "+15551234");

        let recipients = resolve_recipients(
            Some(&c),
            &admins,
            ChannelSet { sms: true, whatsapp: true },
        );
        assert_eq!(
            recipients,
            vec![
                Recipient::email("buyer@example.com"),
                Recipient::sms("+15551234"),
                Recipient::whatsapp("+15551234"),
            ]
        );

        let recipients = resolve_recipients(
            Some(&c),
            &admins,
            ChannelSet { sms: true, whatsapp: false },
        );
        assert_eq!(
            recipients,
            vec![
                Recipient::email("buyer@example.com"),
                Recipient::sms("+15551234"),
            ]
        );

        // No Twilio sender configured: phone alone cannot produce a recipient
        let c = contact(None, "+15551234");
        let recipients = resolve_recipients(Some(&c), &admins, ChannelSet::default());
        assert_eq!(recipients, vec![Recipient::email("ops@example.com")]);
    }

    #[test]
    fn phone_only_customer_reaches_sms() {
        let admins = vec!["ops@example.com".to_string()];
        let c = contact(None, "+15551234");
        let recipients = resolve_recipients(
            Some(&c),
            &admins,
            ChannelSet { sms: true, whatsapp: false },
        );
        assert_eq!(recipients, vec![Recipient::sms("+15551234")]);
    }

    #[test]
    fn no_recipients_when_nothing_configured() {
        assert!(resolve_recipients(None, &[], ChannelSet::default()).is_empty());
    }
}

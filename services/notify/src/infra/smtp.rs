use std::time::Duration;

use anyhow::Context as _;
use lettre::message::{Mailbox, MultiPart};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpSettings;
use crate::domain::repository::MailTransport;
use crate::domain::types::MailRecord;
use crate::error::NotifyServiceError;

/// Bounded connection/read timeout so a hung relay cannot stall the
/// dispatch loop; a stalled send fails and retries per backoff.
pub const SMTP_TIMEOUT_SECS: u64 = 10;

/// Plain SMTP submission to a single configured relay. Authentication and
/// TLS are delegated to relay configuration.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyServiceError> {
        let address = settings
            .from_address
            .parse::<lettre::Address>()
            .map_err(anyhow::Error::new)
            .context("invalid SMTP from-address")?;
        let from = Mailbox::new(Some(settings.from_name.clone()), address);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port)
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build();
        Ok(Self { transport, from })
    }
}

impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &MailRecord) -> Result<(), NotifyServiceError> {
        let to = mail
            .recipient_email
            .parse::<lettre::Address>()
            .map_err(|_| NotifyServiceError::InvalidRecipient(mail.recipient_email.clone()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to))
            .subject(mail.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                mail.body_text.clone(),
                mail.body_html.clone(),
            ))
            .map_err(|e| NotifyServiceError::Delivery(e.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyServiceError::Delivery(e.to_string()))?;
        Ok(())
    }
}

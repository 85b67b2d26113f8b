//! Outbound mail transports.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use governor::Quota;
use governor::RateLimiter;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport;
use lettre::Message;
use lettre::Tokio1Executor;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use tracing::debug;
use tracing::info;

use crate::channel::error::TransportError;
use crate::config::MailConfig;
use crate::config::SmtpSecurity;

/// Sends one plain-text message to one address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Waits until the transport may send again. Not subject to the send timeout.
    async fn ready(&self) {}

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError>;
}

/// SMTP delivery through lettre, optionally rate limited.
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl SmtpMailTransport {
    pub fn new(config: &MailConfig, timeout: Duration) -> Result<Self, TransportError> {
        let from = parse_mailbox(&config.from_email)?;

        let builder = match config.smtp_security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            }
        };
        let mut builder = builder.port(config.smtp_port).timeout(Some(timeout));
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let limiter = config
            .rate_per_minute
            .and_then(NonZeroU32::new)
            .map(|rate| RateLimiter::direct(Quota::per_minute(rate)));

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            "Initializing SMTP mail transport."
        );
        Ok(Self {
            mailer: builder.build(),
            from,
            limiter,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn ready(&self) {
        if let Some(limiter) = &self.limiter
            && limiter.check().is_err()
        {
            debug!("Mail rate limit reached, waiting.");
            limiter.until_ready().await;
        }
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        match self.mailer.send(email).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_permanent() => Err(TransportError::Rejected {
                message: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes messages to the log. Used in development and when no SMTP server is configured.
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        parse_mailbox(to)?;
        info!(to, subject, "Mail (log backend)");
        debug!("{body}");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| TransportError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        })
}

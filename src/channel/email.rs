use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::Channel;
use super::DispatchOutcome;
use super::FailureReason;
use crate::alert::render::RenderedMessage;
use crate::channel::transport::MailTransport;
use crate::entity::Subscriber;

/// Email delivery. Transport errors and timeouts become `Failed` outcomes.
///
/// The send timeout covers only the send itself, not the wait for the transport's rate limit.
pub struct EmailChannel {
    transport: Arc<dyn MailTransport>,
    send_timeout: Duration,
}

impl EmailChannel {
    pub fn new(transport: Arc<dyn MailTransport>, send_timeout: Duration) -> Self {
        Self {
            transport,
            send_timeout,
        }
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, subscriber: &Subscriber, message: &RenderedMessage) -> DispatchOutcome {
        let Some(address) = subscriber
            .email
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
        else {
            warn!(username = %subscriber.username, "No email address.");
            return DispatchOutcome::Failed(FailureReason::MissingAddress);
        };

        self.transport.ready().await;

        let send = self
            .transport
            .send(address, &message.subject, &message.body);
        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(())) => {
                info!(username = %subscriber.username, to = address, "Email sent.");
                DispatchOutcome::Sent
            }
            Ok(Err(e)) => {
                error!(username = %subscriber.username, to = address, error = %e, "Failed to send email.");
                DispatchOutcome::Failed(FailureReason::Transport(e.to_string()))
            }
            Err(_) => {
                error!(
                    username = %subscriber.username,
                    to = address,
                    timeout = ?self.send_timeout,
                    "Email send timed out."
                );
                DispatchOutcome::Failed(FailureReason::TimedOut)
            }
        }
    }
}

//! Notification channels and routing by the subscriber's notification method.
//!
//! Every channel turns a rendered alert into a [`DispatchOutcome`]. Failures are
//! reported as outcomes and never returned as errors, so one subscriber's broken
//! mailbox cannot abort a run.

pub mod chat;
pub mod email;
pub mod error;
pub mod transport;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::alert::render::RenderedMessage;
use crate::channel::chat::ChatChannel;
use crate::channel::chat::DisabledChannel;
use crate::channel::email::EmailChannel;
use crate::entity::NotificationMethod;
use crate::entity::Subscriber;

/// Why a delivery (or the work leading up to it) failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    MissingAddress,
    /// The stored profile could not be read.
    InvalidProfile(String),
    Transport(String),
    TimedOut,
    Store(String),
    Render(String),
    Panicked(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MissingAddress => write!(f, "missing address"),
            FailureReason::InvalidProfile(cause) => write!(f, "invalid profile: {cause}"),
            FailureReason::Transport(cause) => write!(f, "transport error: {cause}"),
            FailureReason::TimedOut => write!(f, "send timed out"),
            FailureReason::Store(cause) => write!(f, "store error: {cause}"),
            FailureReason::Render(cause) => write!(f, "render error: {cause}"),
            FailureReason::Panicked(cause) => write!(f, "worker panicked: {cause}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed(FailureReason),
    /// The channel is declared but not built yet.
    Unimplemented { channel: String },
    /// The subscriber chose not to receive anything.
    Disabled,
}

/// A delivery channel. At most one outbound send per call.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, subscriber: &Subscriber, message: &RenderedMessage) -> DispatchOutcome;
}

/// Routes a message to the channel matching the subscriber's notification method.
pub struct ChannelDispatcher {
    email: EmailChannel,
    chat: ChatChannel,
    disabled: DisabledChannel,
}

impl ChannelDispatcher {
    pub fn new(email: EmailChannel) -> Self {
        Self {
            email,
            chat: ChatChannel,
            disabled: DisabledChannel,
        }
    }

    pub fn channel_for(&self, method: NotificationMethod) -> &dyn Channel {
        match method {
            NotificationMethod::Email => &self.email,
            NotificationMethod::Chat => &self.chat,
            NotificationMethod::None => &self.disabled,
        }
    }

    pub async fn dispatch(
        &self,
        subscriber: &Subscriber,
        message: &RenderedMessage,
    ) -> DispatchOutcome {
        self.channel_for(subscriber.notification_method)
            .send(subscriber, message)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::channel::transport::MockMailTransport;
    use crate::entity::AlertTypes;

    fn subscriber(method: NotificationMethod) -> Subscriber {
        Subscriber {
            id: 1,
            username: "carol".to_string(),
            email: Some("carol@x.com".to_string()),
            enable_notifications: true,
            notification_method: method,
            chat_account_id: Some("U123".to_string()),
            alert_hour: 9,
            alert_days_ahead: 7,
            alert_types: AlertTypes::parse("Job"),
        }
    }

    fn message() -> RenderedMessage {
        RenderedMessage {
            subject: "Upcoming Opportunity Deadlines - 1 Alert(s)".to_string(),
            body: "body".to_string(),
        }
    }

    fn dispatcher(transport: MockMailTransport) -> ChannelDispatcher {
        ChannelDispatcher::new(EmailChannel::new(
            Arc::new(transport),
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn test_chat_is_unimplemented_without_sending() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().never();
        let dispatcher = dispatcher(transport);

        let outcome = dispatcher
            .dispatch(&subscriber(NotificationMethod::Chat), &message())
            .await;
        assert_eq!(
            outcome,
            DispatchOutcome::Unimplemented {
                channel: "slack".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_none_is_disabled_without_sending() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().never();
        let dispatcher = dispatcher(transport);

        let outcome = dispatcher
            .dispatch(&subscriber(NotificationMethod::None), &message())
            .await;
        assert_eq!(outcome, DispatchOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_email_routes_to_transport() {
        let mut transport = MockMailTransport::new();
        transport.expect_ready().times(1).returning(|| ());
        transport.expect_send().times(1).returning(|_, _, _| Ok(()));
        let dispatcher = dispatcher(transport);

        let outcome = dispatcher
            .dispatch(&subscriber(NotificationMethod::Email), &message())
            .await;
        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(dispatcher.channel_for(NotificationMethod::Email).name(), "email");
    }
}

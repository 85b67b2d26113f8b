use async_trait::async_trait;
use tracing::info;

use super::Channel;
use super::DispatchOutcome;
use crate::alert::render::RenderedMessage;
use crate::entity::Subscriber;

/// Slack-style chat delivery.
// TODO: wire the Slack Web API (chat.postMessage to `chat_account_id`) once a bot token is provisioned.
pub struct ChatChannel;

#[async_trait]
impl Channel for ChatChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, subscriber: &Subscriber, _message: &RenderedMessage) -> DispatchOutcome {
        info!(
            username = %subscriber.username,
            chat_account = subscriber.chat_account_id.as_deref().unwrap_or("-"),
            "Slack notifications coming soon."
        );
        DispatchOutcome::Unimplemented {
            channel: self.name().to_string(),
        }
    }
}

/// Notification method `none`: nothing is sent.
pub struct DisabledChannel;

#[async_trait]
impl Channel for DisabledChannel {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn send(&self, subscriber: &Subscriber, _message: &RenderedMessage) -> DispatchOutcome {
        info!(username = %subscriber.username, "Notification method is 'none'.");
        DispatchOutcome::Disabled
    }
}

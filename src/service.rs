//! Service wiring for the alert engine.

use std::sync::Arc;

use log::info;

use crate::alert::render::MessageRenderer;
use crate::channel::ChannelDispatcher;
use crate::channel::email::EmailChannel;
use crate::channel::transport::LogMailTransport;
use crate::channel::transport::MailTransport;
use crate::channel::transport::SmtpMailTransport;
use crate::config::Config;
use crate::config::MailBackend;
use crate::repository::Repository;
use crate::service::alert_service::AlertService;

pub mod alert_service;
pub mod error;

/// Container for all application services.
pub struct Services {
    pub alert: Arc<AlertService>,
}

impl Services {
    /// Creates the services backed by `db` and the configured mail backend.
    pub fn new(db: Arc<Repository>, config: &Config) -> anyhow::Result<Self> {
        let transport: Arc<dyn MailTransport> = match config.mail.backend {
            MailBackend::Smtp => Arc::new(SmtpMailTransport::new(
                &config.mail,
                config.alerts.send_timeout,
            )?),
            MailBackend::Log => {
                info!("Mail backend is `log`; alerts will be written to the log only.");
                Arc::new(LogMailTransport)
            }
        };
        Self::with_transport(db, config, transport)
    }

    /// Same as [`Services::new`] with an explicit mail transport.
    pub fn with_transport(
        db: Arc<Repository>,
        config: &Config,
        transport: Arc<dyn MailTransport>,
    ) -> anyhow::Result<Self> {
        let renderer = MessageRenderer::new(config.alerts.signature.clone())?;
        let dispatcher =
            ChannelDispatcher::new(EmailChannel::new(transport, config.alerts.send_timeout));

        let alert = AlertService::new(
            Arc::new(db.opportunity.clone()),
            Arc::new(db.subscriber.clone()),
            renderer,
            dispatcher,
            config.alerts.max_concurrency,
        );

        Ok(Self {
            alert: Arc::new(alert),
        })
    }
}

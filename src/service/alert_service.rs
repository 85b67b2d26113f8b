//! Deadline alert runs: the hourly batch and the single-user manual trigger.

use std::sync::Arc;

use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Timelike;
use futures::StreamExt;
use futures::stream;
use tracing::Instrument;
use tracing::error;
use tracing::info;
use tracing::info_span;
use tracing::instrument;

use crate::alert::outcome::RunSummary;
use crate::alert::outcome::SubscriberOutcome;
use crate::alert::outcome::SubscriberResult;
use crate::alert::render::MessageRenderer;
use crate::alert::window::DeadlineWindow;
use crate::alert::window::WindowMatch;
use crate::channel::ChannelDispatcher;
use crate::channel::FailureReason;
use crate::entity::Subscriber;
use crate::repository::store::RecordStore;
use crate::repository::store::SubscriberEntry;
use crate::repository::store::SubscriberStore;
use crate::service::error::AlertError;

/// Selects, renders and dispatches deadline alerts.
///
/// Cheap to clone; every run works on its own copies and shares no mutable state,
/// so a manual trigger can overlap a scheduled run. Subscribers of one run are
/// processed concurrently and a slow one never holds back the others.
#[derive(Clone)]
pub struct AlertService {
    subscribers: Arc<dyn SubscriberStore>,
    window: Arc<DeadlineWindow>,
    renderer: Arc<MessageRenderer>,
    dispatcher: Arc<ChannelDispatcher>,
    max_concurrency: usize,
}

impl AlertService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        subscribers: Arc<dyn SubscriberStore>,
        renderer: MessageRenderer,
        dispatcher: ChannelDispatcher,
        max_concurrency: usize,
    ) -> Self {
        Self {
            subscribers,
            window: Arc::new(DeadlineWindow::new(records)),
            renderer: Arc::new(renderer),
            dispatcher: Arc::new(dispatcher),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Alerts every enabled subscriber whose alert hour is the hour of `now`.
    ///
    /// Per-subscriber problems end up in the summary. The only error is failing to load
    /// the eligible subscribers at all.
    pub async fn run_scheduled_alerts(&self, now: NaiveDateTime) -> Result<RunSummary, AlertError> {
        let hour = now.hour();
        let today = now.date();

        let subscribers = self.subscribers.find_by_alert_hour(hour).await?;
        if subscribers.is_empty() {
            info!("No users configured for alerts at {hour}:00");
            return Ok(RunSummary::empty(hour, today));
        }
        info!(
            "Processing deadline alerts for {} users at {hour}:00 ({today}).",
            subscribers.len()
        );

        let mut indexed = stream::iter(subscribers.into_iter().enumerate())
            .map(|(index, entry)| {
                let service = self.clone();
                async move { (index, service.spawn_subscriber(entry, today).await) }
            })
            .buffer_unordered(self.max_concurrency)
            .collect::<Vec<_>>()
            .await;
        indexed.sort_unstable_by_key(|(index, _)| *index);
        let results = indexed.into_iter().map(|(_, result)| result).collect();

        let summary = RunSummary::from_results(hour, today, results);
        info!("Summary: {summary}");
        Ok(summary)
    }

    /// Runs the alert pipeline for one user regardless of their alert hour.
    pub async fn run_alerts_for_subscriber(
        &self,
        username: &str,
        today: NaiveDate,
    ) -> Result<SubscriberResult, AlertError> {
        let span = info_span!("manual_alert", username);
        async {
            let subscriber = self
                .subscribers
                .find_by_username(username)
                .await?
                .ok_or_else(|| AlertError::SubscriberNotFound {
                    username: username.to_string(),
                })?;

            if !subscriber.enable_notifications {
                info!("Notifications disabled.");
                return Ok(SubscriberResult::new(
                    subscriber.username,
                    SubscriberOutcome::SkippedNotificationsDisabled,
                ));
            }

            let outcome = self.process_subscriber(&subscriber, today).await;
            Ok(SubscriberResult::new(subscriber.username, outcome))
        }
        .instrument(span)
        .await
    }

    /// Runs one subscriber on its own task so a panic only fails that subscriber.
    async fn spawn_subscriber(self, entry: SubscriberEntry, today: NaiveDate) -> SubscriberResult {
        let subscriber = match entry {
            Ok(subscriber) => subscriber,
            Err(invalid) => {
                error!(
                    username = %invalid.username,
                    reason = %invalid.reason,
                    "Unreadable subscriber profile."
                );
                return SubscriberResult::new(
                    invalid.username,
                    SubscriberOutcome::failed(FailureReason::InvalidProfile(invalid.reason)),
                );
            }
        };

        let username = subscriber.username.clone();
        let handle =
            tokio::spawn(async move { self.process_subscriber(&subscriber, today).await });
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(username = %username, error = %e, "Alert worker panicked.");
                SubscriberOutcome::failed(FailureReason::Panicked(e.to_string()))
            }
        };
        SubscriberResult::new(username, outcome)
    }

    #[instrument(skip(self, subscriber), fields(username = %subscriber.username))]
    async fn process_subscriber(&self, subscriber: &Subscriber, today: NaiveDate) -> SubscriberOutcome {
        let opportunities = match self.window.filter(subscriber, today).await {
            Ok(WindowMatch::NoTypesConfigured) => {
                info!("No alert types configured.");
                return SubscriberOutcome::SkippedNoTypes;
            }
            Ok(WindowMatch::Matched(opportunities)) if opportunities.is_empty() => {
                info!("No matching opportunities.");
                return SubscriberOutcome::SkippedNoMatches;
            }
            Ok(WindowMatch::Matched(opportunities)) => opportunities,
            Err(e) => {
                error!(error = %e, "Failed to load opportunities.");
                return SubscriberOutcome::failed(FailureReason::Store(e.to_string()));
            }
        };

        let message = match self.renderer.render(subscriber, &opportunities, today) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Failed to render alert.");
                return SubscriberOutcome::failed(FailureReason::Render(e.to_string()));
            }
        };

        let dispatched = self.dispatcher.dispatch(subscriber, &message).await;
        let outcome = SubscriberOutcome::from_dispatch(dispatched, opportunities.len());
        info!(
            method = %subscriber.notification_method,
            outcome = %outcome,
            "Processed {} opportunities.",
            opportunities.len()
        );
        outcome
    }
}

//! Per-subscriber outcomes and the aggregate run summary.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::channel::DispatchOutcome;
use crate::channel::FailureReason;

/// What happened to one subscriber during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubscriberOutcome {
    SkippedNoTypes,
    SkippedNoMatches,
    /// Only produced by the manual trigger; scheduled runs never select these subscribers.
    SkippedNotificationsDisabled,
    Sent { records: usize },
    Failed { reason: FailureReason, records: usize },
    Unimplemented { channel: String, records: usize },
    Disabled { records: usize },
}

impl SubscriberOutcome {
    pub fn from_dispatch(outcome: DispatchOutcome, records: usize) -> Self {
        match outcome {
            DispatchOutcome::Sent => SubscriberOutcome::Sent { records },
            DispatchOutcome::Failed(reason) => SubscriberOutcome::Failed { reason, records },
            DispatchOutcome::Unimplemented { channel } => {
                SubscriberOutcome::Unimplemented { channel, records }
            }
            DispatchOutcome::Disabled => SubscriberOutcome::Disabled { records },
        }
    }

    /// Failure that happened before anything was dispatched.
    pub fn failed(reason: FailureReason) -> Self {
        SubscriberOutcome::Failed { reason, records: 0 }
    }
}

impl fmt::Display for SubscriberOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriberOutcome::SkippedNoTypes => write!(f, "skipped: no alert types configured"),
            SubscriberOutcome::SkippedNoMatches => write!(f, "skipped: no matching opportunities"),
            SubscriberOutcome::SkippedNotificationsDisabled => {
                write!(f, "skipped: notifications disabled")
            }
            SubscriberOutcome::Sent { records } => write!(f, "sent {records} opportunities"),
            SubscriberOutcome::Failed { reason, .. } => write!(f, "failed: {reason}"),
            SubscriberOutcome::Unimplemented { channel, records } => write!(
                f,
                "{channel} notifications coming soon ({records} opportunities ready)"
            ),
            SubscriberOutcome::Disabled { .. } => write!(f, "notification method set to 'none'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberResult {
    pub username: String,
    pub outcome: SubscriberOutcome,
}

impl SubscriberResult {
    pub fn new(username: impl Into<String>, outcome: SubscriberOutcome) -> Self {
        Self {
            username: username.into(),
            outcome,
        }
    }
}

impl fmt::Display for SubscriberResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.username, self.outcome)
    }
}

/// Aggregate report for one scheduled run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub hour: u32,
    pub date: NaiveDate,
    pub subscribers_processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub unimplemented: usize,
    pub disabled: usize,
    pub skipped_no_types: usize,
    pub skipped_no_matches: usize,
    /// Opportunities included in successfully sent messages.
    pub records_delivered: usize,
    pub results: Vec<SubscriberResult>,
}

impl RunSummary {
    /// Summary for an hour with no eligible subscribers.
    pub fn empty(hour: u32, date: NaiveDate) -> Self {
        Self {
            hour,
            date,
            subscribers_processed: 0,
            sent: 0,
            failed: 0,
            unimplemented: 0,
            disabled: 0,
            skipped_no_types: 0,
            skipped_no_matches: 0,
            records_delivered: 0,
            results: Vec::new(),
        }
    }

    pub fn from_results(hour: u32, date: NaiveDate, results: Vec<SubscriberResult>) -> Self {
        let mut summary = Self::empty(hour, date);
        summary.subscribers_processed = results.len();
        for result in &results {
            match &result.outcome {
                SubscriberOutcome::SkippedNoTypes => summary.skipped_no_types += 1,
                SubscriberOutcome::SkippedNoMatches => summary.skipped_no_matches += 1,
                SubscriberOutcome::SkippedNotificationsDisabled => {}
                SubscriberOutcome::Sent { records } => {
                    summary.sent += 1;
                    summary.records_delivered += records;
                }
                SubscriberOutcome::Failed { .. } => summary.failed += 1,
                SubscriberOutcome::Unimplemented { .. } => summary.unimplemented += 1,
                SubscriberOutcome::Disabled { .. } => summary.disabled += 1,
            }
        }
        summary.results = results;
        summary
    }

    /// True when no subscriber was eligible this hour.
    pub fn is_empty(&self) -> bool {
        self.subscribers_processed == 0
    }

    pub fn result_for(&self, username: &str) -> Option<&SubscriberResult> {
        self.results.iter().find(|r| r.username == username)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No users to alert at {}:00", self.hour);
        }
        write!(
            f,
            "Processed alerts for {} users: {} emails sent ({} opportunities), {} failed, \
             {} chat pending, {} disabled, {} without alert types, {} without matches",
            self.subscribers_processed,
            self.sent,
            self.records_delivered,
            self.failed,
            self.unimplemented,
            self.disabled,
            self.skipped_no_types,
            self.skipped_no_matches
        )
    }
}

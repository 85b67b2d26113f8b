//! Deadline window filter.

use std::sync::Arc;

use chrono::Days;
use chrono::NaiveDate;

use crate::entity::DeadlineQueryBuilder;
use crate::entity::OpportunityModel;
use crate::entity::Subscriber;
use crate::repository::error::DatabaseError;
use crate::repository::store::RecordStore;

/// Result of matching a subscriber's preferences against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowMatch {
    /// The subscriber has no alert types, so nothing was queried.
    NoTypesConfigured,
    /// Matching opportunities ordered by (deadline, id). May be empty.
    Matched(Vec<OpportunityModel>),
}

/// Selects the opportunities a subscriber should hear about on a given day.
pub struct DeadlineWindow {
    store: Arc<dyn RecordStore>,
}

impl DeadlineWindow {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Last day included in the subscriber's window, saturating at `NaiveDate::MAX`.
    pub fn end_date(today: NaiveDate, days_ahead: u32) -> NaiveDate {
        today
            .checked_add_days(Days::new(days_ahead.into()))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Opportunities with a deadline in `[today, today + alert_days_ahead]` and a category
    /// in the subscriber's alert types.
    pub async fn filter(
        &self,
        subscriber: &Subscriber,
        today: NaiveDate,
    ) -> Result<WindowMatch, DatabaseError> {
        if subscriber.alert_types.is_empty() {
            return Ok(WindowMatch::NoTypesConfigured);
        }

        let query = DeadlineQueryBuilder::default()
            .categories(subscriber.alert_types.as_slice().to_vec())
            .from(today)
            .until(Self::end_date(today, subscriber.alert_days_ahead))
            .build()?;

        let mut opportunities = self.store.find_deadlines(&query).await?;
        opportunities.retain(|opportunity| query.matches(opportunity));
        opportunities.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));

        Ok(WindowMatch::Matched(opportunities))
    }
}

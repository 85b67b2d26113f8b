//! Read-side contracts the alert engine depends on.
//!
//! The SQLite tables implement these; tests swap in in-memory stores.

use async_trait::async_trait;

use crate::entity::DeadlineQuery;
use crate::entity::InvalidSubscriber;
use crate::entity::OpportunityModel;
use crate::entity::Subscriber;
use crate::repository::error::DatabaseError;
use crate::repository::table::OpportunityTable;
use crate::repository::table::SubscriberTable;

/// A subscriber selected for a run, or the row that could not be read.
pub type SubscriberEntry = Result<Subscriber, InvalidSubscriber>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Opportunities matching `query`, ordered by deadline ascending.
    async fn find_deadlines(
        &self,
        query: &DeadlineQuery,
    ) -> Result<Vec<OpportunityModel>, DatabaseError>;
}

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Subscribers with notifications enabled whose alert hour is `hour`, ordered by username.
    ///
    /// A malformed row is returned as an `Err` entry; only a failed lookup is an error.
    async fn find_by_alert_hour(&self, hour: u32) -> Result<Vec<SubscriberEntry>, DatabaseError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Subscriber>, DatabaseError>;
}

#[async_trait]
impl RecordStore for OpportunityTable {
    async fn find_deadlines(
        &self,
        query: &DeadlineQuery,
    ) -> Result<Vec<OpportunityModel>, DatabaseError> {
        self.select_by_deadline_query(query).await
    }
}

#[async_trait]
impl SubscriberStore for SubscriberTable {
    async fn find_by_alert_hour(&self, hour: u32) -> Result<Vec<SubscriberEntry>, DatabaseError> {
        let rows = self.select_enabled_by_alert_hour(hour).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.map(Subscriber::from))
            .collect())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Subscriber>, DatabaseError> {
        Ok(self.select_by_username(username).await?.map(Subscriber::from))
    }
}

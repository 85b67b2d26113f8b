//! Common test utilities and in-memory stand-ins for the stores and mail transport.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use deadline_alerts::alert::render::DEFAULT_SIGNATURE;
use deadline_alerts::alert::render::MessageRenderer;
use deadline_alerts::channel::ChannelDispatcher;
use deadline_alerts::channel::email::EmailChannel;
use deadline_alerts::channel::error::TransportError;
use deadline_alerts::channel::transport::MailTransport;
use deadline_alerts::entity::AlertTypes;
use deadline_alerts::entity::Category;
use deadline_alerts::entity::DeadlineQuery;
use deadline_alerts::entity::NotificationMethod;
use deadline_alerts::entity::OpportunityModel;
use deadline_alerts::entity::Subscriber;
use deadline_alerts::repository::Repository;
use deadline_alerts::repository::error::DatabaseError;
use deadline_alerts::repository::store::RecordStore;
use deadline_alerts::repository::store::SubscriberEntry;
use deadline_alerts::repository::store::SubscriberStore;
use deadline_alerts::service::alert_service::AlertService;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Sets up a temporary test database.
#[allow(dead_code)]
pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("deadline-alerts-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let db = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    db.run_migrations().await.expect("Failed to run migrations");

    (Arc::new(db), db_path)
}

/// Cleans up the test database file.
#[allow(dead_code)]
pub async fn teardown_db(db_path: PathBuf) {
    if db_path.exists() {
        let _ = std::fs::remove_file(db_path);
    }
}

/// Opens a separate pool on the test database for raw SQL.
#[allow(dead_code)]
pub async fn raw_pool(db_path: &Path) -> SqlitePool {
    SqlitePool::connect(&format!("sqlite://{}", db_path.to_str().unwrap()))
        .await
        .expect("Failed to open database")
}

// FIXTURES

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[allow(dead_code)]
pub fn opportunity(id: i32, title: &str, deadline: NaiveDate, category: &str) -> OpportunityModel {
    OpportunityModel {
        id,
        title: title.to_string(),
        deadline,
        category: Category::from(category),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn subscriber(username: &str, alert_hour: u32, alert_types: &str) -> Subscriber {
    Subscriber {
        id: 0,
        username: username.to_string(),
        email: Some(format!("{username}@x.com")),
        enable_notifications: true,
        notification_method: NotificationMethod::Email,
        chat_account_id: None,
        alert_hour,
        alert_days_ahead: 7,
        alert_types: AlertTypes::parse(alert_types),
    }
}

// MOCK STORES

/// Opportunity store backed by a vector. Ignores `limit`.
#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryRecordStore {
    pub records: RwLock<Vec<OpportunityModel>>,
}

#[allow(dead_code)]
impl MemoryRecordStore {
    pub fn new(records: Vec<OpportunityModel>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_deadlines(
        &self,
        query: &DeadlineQuery,
    ) -> Result<Vec<OpportunityModel>, DatabaseError> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }
}

/// Record store whose every lookup fails.
#[allow(dead_code)]
pub struct FailingRecordStore;

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn find_deadlines(
        &self,
        _query: &DeadlineQuery,
    ) -> Result<Vec<OpportunityModel>, DatabaseError> {
        Err(DatabaseError::InternalError {
            message: "store offline".to_string(),
        })
    }
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MemorySubscriberStore {
    pub subscribers: RwLock<Vec<Subscriber>>,
}

#[allow(dead_code)]
impl MemorySubscriberStore {
    pub fn new(subscribers: Vec<Subscriber>) -> Self {
        Self {
            subscribers: RwLock::new(subscribers),
        }
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscriberStore {
    async fn find_by_alert_hour(&self, hour: u32) -> Result<Vec<SubscriberEntry>, DatabaseError> {
        let mut found: Vec<Subscriber> = self
            .subscribers
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.enable_notifications && s.alert_hour == hour)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(found.into_iter().map(Ok).collect())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Subscriber>, DatabaseError> {
        Ok(self
            .subscribers
            .read()
            .unwrap()
            .iter()
            .find(|s| s.username == username)
            .cloned())
    }
}

// MOCK MAIL

#[derive(Clone, Debug, PartialEq)]
#[allow(dead_code)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records every message and rejects those addressed to `reject`.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<SentMail>>,
    pub reject: Option<String>,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn rejecting(address: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: Some(address.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        if self.reject.as_deref() == Some(to) {
            return Err(TransportError::Rejected {
                message: format!("mailbox {to} unavailable"),
            });
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Builds an [`AlertService`] over the given stores and transport.
#[allow(dead_code)]
pub fn alert_service(
    records: Arc<dyn RecordStore>,
    subscribers: Arc<dyn SubscriberStore>,
    transport: Arc<dyn MailTransport>,
) -> AlertService {
    let renderer = MessageRenderer::new(DEFAULT_SIGNATURE).expect("Failed to load template");
    let dispatcher = ChannelDispatcher::new(EmailChannel::new(transport, Duration::from_secs(5)));
    AlertService::new(records, subscribers, renderer, dispatcher, 4)
}

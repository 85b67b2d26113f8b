//! Records, subscribers and the preference types parsed from them.

use std::fmt;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Timelike;
use chrono::Utc;
use derive_builder::Builder;
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;

/// Opportunity type tag (e.g. "Job", "Internship", "Conference", "Other").
///
/// The set of tags is data-driven, so this is an open newtype rather than an enum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, de-duplicated set of categories a subscriber wants alerts for.
///
/// Order is kept for display only; matching is pure membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertTypes(Vec<Category>);

impl AlertTypes {
    /// Parses the stored comma-separated form, e.g. `"Job, Internship,,"`.
    pub fn parse(raw: &str) -> Self {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(Category::new)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, category: &Category) -> bool {
        self.0.contains(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Category] {
        &self.0
    }
}

impl FromIterator<Category> for AlertTypes {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut tags: Vec<Category> = Vec::new();
        for tag in iter {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Self(tags)
    }
}

impl fmt::Display for AlertTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

/// Delivery channel chosen by a subscriber.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, Default, PartialEq, Eq, Hash)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationMethod {
    #[default]
    Email,
    /// Slack-style chat delivery. Declared, not wired yet.
    #[sqlx(rename = "slack")]
    #[serde(rename = "slack", alias = "chat")]
    Chat,
    None,
}

impl NotificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationMethod::Email => "email",
            NotificationMethod::Chat => "slack",
            NotificationMethod::None => "none",
        }
    }
}

impl fmt::Display for NotificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opportunity with a deadline.
///
/// Owned by whoever posts opportunities; the alert engine only reads it.
#[derive(FromRow, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct OpportunityModel {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub title: String,
    /// Pure calendar date. Compared against "today" date-only.
    #[serde(default)]
    pub deadline: NaiveDate,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub posted_by: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

/// Subscriber row as stored, alert types still in comma-separated form.
#[derive(FromRow, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubscriberModel {
    #[serde(default)]
    pub id: i32,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub enable_notifications: bool,
    pub notification_method: NotificationMethod,
    /// Reserved for the chat channel.
    #[serde(default)]
    pub chat_account_id: Option<String>,
    /// Only the hour is used for eligibility.
    pub alert_time: NaiveTime,
    pub alert_days_ahead: u32,
    pub alert_types: String,
}

impl Default for SubscriberModel {
    fn default() -> Self {
        Self {
            id: 0,
            username: String::new(),
            email: None,
            enable_notifications: true,
            notification_method: NotificationMethod::Email,
            chat_account_id: None,
            alert_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            alert_days_ahead: 7,
            alert_types: "Job,Internship".to_string(),
        }
    }
}

/// Parsed view of a subscriber that the alert engine works with.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Subscriber {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub enable_notifications: bool,
    pub notification_method: NotificationMethod,
    pub chat_account_id: Option<String>,
    /// 0-23.
    pub alert_hour: u32,
    pub alert_days_ahead: u32,
    pub alert_types: AlertTypes,
}

impl From<SubscriberModel> for Subscriber {
    fn from(model: SubscriberModel) -> Self {
        Self {
            id: model.id,
            alert_hour: model.alert_time.hour(),
            alert_types: AlertTypes::parse(&model.alert_types),
            username: model.username,
            email: model.email,
            enable_notifications: model.enable_notifications,
            notification_method: model.notification_method,
            chat_account_id: model.chat_account_id,
            alert_days_ahead: model.alert_days_ahead,
        }
    }
}

/// A stored subscriber row that could not be read into a [`Subscriber`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidSubscriber {
    pub username: String,
    pub reason: String,
}

/// Filter for deadline lookups against the opportunity store.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(pattern = "immutable")]
pub struct DeadlineQuery {
    /// Matched by membership. An empty list matches nothing.
    #[builder(setter(into))]
    pub categories: Vec<Category>,
    /// Inclusive.
    pub from: NaiveDate,
    /// Inclusive.
    pub until: NaiveDate,
    #[builder(default)]
    pub limit: Option<u32>,
}

impl DeadlineQuery {
    /// Whether `opportunity` falls inside this query.
    pub fn matches(&self, opportunity: &OpportunityModel) -> bool {
        opportunity.deadline >= self.from
            && opportunity.deadline <= self.until
            && self.categories.contains(&opportunity.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_types_parse() {
        let types = AlertTypes::parse(" Job, Internship ,, Job ,Conference,");
        let tags: Vec<&str> = types.iter().map(Category::as_str).collect();
        assert_eq!(tags, vec!["Job", "Internship", "Conference"]);
        assert!(types.contains(&Category::from("Internship")));
        assert!(!types.contains(&Category::from("Other")));
        assert_eq!(types.to_string(), "Job,Internship,Conference");
    }

    #[test]
    fn test_alert_types_parse_empty() {
        assert!(AlertTypes::parse("").is_empty());
        assert!(AlertTypes::parse(" , ,").is_empty());
    }

    #[test]
    fn test_subscriber_from_model_ignores_minutes() {
        let model = SubscriberModel {
            username: "alice".to_string(),
            alert_time: NaiveTime::from_hms_opt(7, 45, 30).unwrap(),
            alert_types: "Job".to_string(),
            ..Default::default()
        };
        let subscriber = Subscriber::from(model);
        assert_eq!(subscriber.alert_hour, 7);
        assert_eq!(subscriber.alert_types.len(), 1);
    }

    #[test]
    fn test_notification_method_serde() {
        let method: NotificationMethod = serde_json::from_str("\"chat\"").unwrap();
        assert_eq!(method, NotificationMethod::Chat);
        assert_eq!(serde_json::to_string(&method).unwrap(), "\"slack\"");
        assert_eq!(NotificationMethod::None.to_string(), "none");
    }
}

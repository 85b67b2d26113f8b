//! Renders alert messages from the `deadline_alert.txt` template.

use chrono::NaiveDate;
use minijinja::Environment;
use serde::Serialize;

use crate::entity::OpportunityModel;
use crate::entity::Subscriber;

const TEMPLATE_NAME: &str = "deadline_alert.txt";
const NOTES_EXCERPT_CHARS: usize = 150;
pub const DEFAULT_SIGNATURE: &str = "Opportunities Alert System";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Subject and plain-text body of one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

#[derive(Serialize)]
struct AlertContext<'a> {
    username: &'a str,
    count: usize,
    items: Vec<AlertItem<'a>>,
    signature: &'a str,
}

#[derive(Serialize)]
struct AlertItem<'a> {
    title: &'a str,
    category: &'a str,
    urgency: String,
    deadline: String,
    posted_by: Option<&'a str>,
    notes: Option<String>,
}

pub struct MessageRenderer {
    jinja_env: Environment<'static>,
    signature: String,
}

impl MessageRenderer {
    pub fn new(signature: impl Into<String>) -> Result<Self, RenderError> {
        let mut jinja_env = Environment::new();
        jinja_env.set_trim_blocks(true);
        jinja_env.set_lstrip_blocks(true);
        jinja_env.add_template(
            TEMPLATE_NAME,
            include_str!("../../assets/deadline_alert.txt"),
        )?;

        Ok(Self {
            jinja_env,
            signature: signature.into(),
        })
    }

    /// Builds the alert for `opportunities`, with urgency relative to `today`.
    pub fn render(
        &self,
        subscriber: &Subscriber,
        opportunities: &[OpportunityModel],
        today: NaiveDate,
    ) -> Result<RenderedMessage, RenderError> {
        let subject = format!(
            "Upcoming Opportunity Deadlines - {} Alert(s)",
            opportunities.len()
        );

        let items = opportunities
            .iter()
            .map(|opportunity| AlertItem {
                title: &opportunity.title,
                category: opportunity.category.as_str(),
                urgency: urgency_label((opportunity.deadline - today).num_days()),
                deadline: opportunity.deadline.to_string(),
                posted_by: non_blank(opportunity.posted_by.as_deref()),
                notes: non_blank(opportunity.notes.as_deref()).map(notes_excerpt),
            })
            .collect();

        let context = AlertContext {
            username: &subscriber.username,
            count: opportunities.len(),
            items,
            signature: &self.signature,
        };
        let body = self.jinja_env.get_template(TEMPLATE_NAME)?.render(&context)?;

        Ok(RenderedMessage { subject, body })
    }
}

/// "TODAY", "TOMORROW", "in N days", or "N days ago" for past deadlines.
pub fn urgency_label(days_until: i64) -> String {
    match days_until {
        0 => "TODAY".to_string(),
        1 => "TOMORROW".to_string(),
        -1 => "1 day ago".to_string(),
        n if n < 0 => format!("{} days ago", -n),
        n => format!("in {n} days"),
    }
}

/// First 150 characters of `notes`, with "..." appended only when cut.
pub fn notes_excerpt(notes: &str) -> String {
    match notes.char_indices().nth(NOTES_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &notes[..cut]),
        None => notes.to_string(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::AlertTypes;
    use crate::entity::Category;
    use crate::entity::NotificationMethod;

    fn subscriber() -> Subscriber {
        Subscriber {
            id: 1,
            username: "alice".to_string(),
            email: Some("alice@x.com".to_string()),
            enable_notifications: true,
            notification_method: NotificationMethod::Email,
            chat_account_id: None,
            alert_hour: 7,
            alert_days_ahead: 7,
            alert_types: AlertTypes::parse("Job"),
        }
    }

    fn opportunity(id: i32, title: &str, deadline: NaiveDate) -> OpportunityModel {
        OpportunityModel {
            id,
            title: title.to_string(),
            deadline,
            category: Category::from("Job"),
            ..Default::default()
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_urgency_label() {
        assert_eq!(urgency_label(0), "TODAY");
        assert_eq!(urgency_label(1), "TOMORROW");
        assert_eq!(urgency_label(2), "in 2 days");
        assert_eq!(urgency_label(5), "in 5 days");
        assert_eq!(urgency_label(-1), "1 day ago");
        assert_eq!(urgency_label(-4), "4 days ago");
    }

    #[test]
    fn test_notes_excerpt() {
        assert_eq!(notes_excerpt("short"), "short");

        let exact = "a".repeat(150);
        assert_eq!(notes_excerpt(&exact), exact);

        let long = "é".repeat(151);
        let excerpt = notes_excerpt(&long);
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), 153);
    }

    #[test]
    fn test_render_message() {
        let renderer = MessageRenderer::new(DEFAULT_SIGNATURE).unwrap();
        let mut first = opportunity(1, "Acme SWE", date(1));
        first.posted_by = Some("bob".to_string());
        first.notes = Some("Bring a resume".to_string());
        let second = opportunity(2, "Globex Intern", date(2));
        let third = opportunity(3, "Initech", date(6));

        let message = renderer
            .render(&subscriber(), &[first, second, third], date(1))
            .unwrap();

        assert_eq!(message.subject, "Upcoming Opportunity Deadlines - 3 Alert(s)");
        let expected = "\
Hello alice,

You have 3 upcoming opportunity deadline(s):

🚨 'Acme SWE' (Job) - Due TODAY (2024-03-01)
   Posted by: bob
   Notes: Bring a resume

🚨 'Globex Intern' (Job) - Due TOMORROW (2024-03-02)

🚨 'Initech' (Job) - Due in 5 days (2024-03-06)

---
To update your notification preferences, contact your administrator.

Best regards,
Opportunities Alert System";
        assert_eq!(message.body, expected);
    }

    #[test]
    fn test_render_skips_blank_attribution() {
        let renderer = MessageRenderer::new("Team").unwrap();
        let mut record = opportunity(1, "Acme SWE", date(3));
        record.posted_by = Some("  ".to_string());
        record.notes = Some(String::new());

        let message = renderer.render(&subscriber(), &[record], date(1)).unwrap();
        assert!(message.body.contains("Due in 2 days (2024-03-03)"));
        assert!(!message.body.contains("Posted by"));
        assert!(!message.body.contains("Notes:"));
        assert!(message.body.ends_with("Best regards,\nTeam"));
    }
}

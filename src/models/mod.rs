use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    /// Stored as authored, shortcodes unexpanded. Expansion happens at
    /// render time in the public routes.
    pub content: String,
    pub status: PostStatus,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub views: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of a post's content, appended at publish time.
#[derive(Debug, Clone, Serialize)]
pub struct Revision {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quiz {
    pub id: i64,
    pub post_id: i64,
    pub questions: serde_json::Value,
    pub attempts: i64,
    pub successes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub id: i64,
    pub post_id: i64,
    pub chart_type: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub id: i64,
    pub post_id: i64,
    pub url: String,
    pub filename: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// The closed set of embeddable widget kinds. Each renders as a `<div>`
/// placeholder carrying a kind-specific class and data attribute; the
/// client fetches the widget payload by id and hydrates it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Quiz,
    Chart,
    Video,
    Pdf,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 4] = [
        WidgetKind::Quiz,
        WidgetKind::Chart,
        WidgetKind::Video,
        WidgetKind::Pdf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Quiz => "quiz",
            WidgetKind::Chart => "chart",
            WidgetKind::Video => "video",
            WidgetKind::Pdf => "pdf",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "quiz" => Some(WidgetKind::Quiz),
            "chart" => Some(WidgetKind::Chart),
            "video" => Some(WidgetKind::Video),
            "pdf" => Some(WidgetKind::Pdf),
            _ => None,
        }
    }

    pub fn css_class(&self) -> String {
        format!("interactive-{}", self.as_str())
    }

    pub fn placeholder(&self, id: i64) -> String {
        format!(
            "<div class=\"{}\" data-{}-id=\"{}\"></div>",
            self.css_class(),
            self.as_str(),
            id
        )
    }

    /// The bracket directive authors paste into post content.
    pub fn shortcode(&self, id: i64) -> String {
        format!("[{} id={}]", self.as_str(), id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    View,
    LoginSuccess,
    LoginFailed,
    QuizAttempt,
    QuizSuccess,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::LoginSuccess => "login_success",
            EventKind::LoginFailed => "login_failed",
            EventKind::QuizAttempt => "quiz_attempt",
            EventKind::QuizSuccess => "quiz_success",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(EventKind::View),
            "login_success" => Some(EventKind::LoginSuccess),
            "login_failed" => Some(EventKind::LoginFailed),
            "quiz_attempt" => Some(EventKind::QuizAttempt),
            "quiz_success" => Some(EventKind::QuizSuccess),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsLog {
    pub id: i64,
    /// 0 is the sentinel for platform-level events (logins).
    pub post_id: i64,
    pub event_type: EventKind,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub failed_attempts: i64,
    pub last_attempt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockedIp {
    pub id: i64,
    pub ip_address: String,
    pub blocked_at: DateTime<Utc>,
    pub reason: String,
}

pub mod db_operations;

use crate::models::db_operations::{
    analytics_db_operations, posts_db_operations, widgets_db_operations,
};
use crate::models::PostStatus;
use chrono::{Duration, Utc};
use rusqlite::{Connection, Result as RusqliteResult};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_posts: usize,
    pub published_posts: usize,
    pub total_views: i64,
}

#[derive(Debug, Serialize)]
pub struct ViewSeries {
    pub labels: Vec<String>,
    pub data: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct QuizSeries {
    pub labels: Vec<String>,
    pub attempts: Vec<i64>,
    pub successes: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct DashboardAnalytics {
    pub views: ViewSeries,
    pub quiz: QuizSeries,
}

pub fn dashboard_summary(conn: &Connection, author_id: i64) -> RusqliteResult<DashboardSummary> {
    let posts = posts_db_operations::read_posts_by_author(conn, author_id)?;
    Ok(DashboardSummary {
        total_posts: posts.len(),
        published_posts: posts
            .iter()
            .filter(|p| p.status == PostStatus::Published)
            .count(),
        total_views: posts.iter().map(|p| p.views).sum(),
    })
}

/// Chart-ready series: per-day view counts for the last 30 days plus
/// attempt/success counters for every quiz on the author's posts.
pub fn dashboard_analytics(
    conn: &Connection,
    author_id: i64,
) -> RusqliteResult<DashboardAnalytics> {
    let since = Utc::now() - Duration::days(30);
    let buckets = analytics_db_operations::count_views_by_day(conn, since)?;
    let (labels, data) = buckets.into_iter().unzip();

    let quizzes = widgets_db_operations::read_quizzes_for_author_posts(conn, author_id)?;
    let quiz = QuizSeries {
        labels: quizzes.iter().map(|q| format!("Quiz {}", q.id)).collect(),
        attempts: quizzes.iter().map(|q| q.attempts).collect(),
        successes: quizzes.iter().map(|q| q.successes).collect(),
    };

    Ok(DashboardAnalytics {
        views: ViewSeries { labels, data },
        quiz,
    })
}

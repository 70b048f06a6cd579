use crate::models::{AnalyticsLog, EventKind};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as RusqliteResult};

/// `post_id` for events not tied to any post (logins).
pub const PLATFORM_EVENT_POST_ID: i64 = 0;

pub fn append_event(
    conn: &Connection,
    post_id: i64,
    event_type: EventKind,
    ip_address: &str,
    now: DateTime<Utc>,
) -> RusqliteResult<()> {
    conn.execute(
        "INSERT INTO analytics_logs (post_id, event_type, ip_address, timestamp)
         VALUES (?1, ?2, ?3, ?4)",
        params![post_id, event_type.as_str(), ip_address, now],
    )?;
    Ok(())
}

fn row_to_log(row: &rusqlite::Row) -> RusqliteResult<AnalyticsLog> {
    let kind_str: String = row.get(2)?;
    Ok(AnalyticsLog {
        id: row.get(0)?,
        post_id: row.get(1)?,
        event_type: EventKind::parse(&kind_str).unwrap_or(EventKind::View),
        ip_address: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

/// Recent login audit trail, newest first.
pub fn read_login_events(conn: &Connection, limit: u32) -> RusqliteResult<Vec<AnalyticsLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, post_id, event_type, ip_address, timestamp FROM analytics_logs
         WHERE event_type IN ('login_success', 'login_failed')
         ORDER BY timestamp DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], row_to_log)?;
    rows.collect()
}

/// View counts bucketed per calendar day since `since`, oldest day first.
pub fn count_views_by_day(
    conn: &Connection,
    since: DateTime<Utc>,
) -> RusqliteResult<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT date(timestamp) AS day, COUNT(*) FROM analytics_logs
         WHERE event_type = 'view' AND timestamp >= ?1
         GROUP BY day ORDER BY day",
    )?;
    let rows = stmt.query_map(params![since], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

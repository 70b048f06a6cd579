use crate::models::{Chart, Quiz, Video};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as RusqliteResult};

pub fn create_quiz(
    conn: &Connection,
    post_id: i64,
    questions: &serde_json::Value,
) -> RusqliteResult<i64> {
    conn.execute(
        "INSERT INTO quizzes (post_id, questions) VALUES (?1, ?2)",
        params![post_id, questions],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_quiz(conn: &Connection, quiz_id: i64) -> RusqliteResult<Option<Quiz>> {
    conn.query_row(
        "SELECT id, post_id, questions, attempts, successes FROM quizzes WHERE id = ?1",
        [quiz_id],
        |row| {
            Ok(Quiz {
                id: row.get(0)?,
                post_id: row.get(1)?,
                questions: row.get(2)?,
                attempts: row.get(3)?,
                successes: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn read_quizzes_for_author_posts(
    conn: &Connection,
    author_id: i64,
) -> RusqliteResult<Vec<Quiz>> {
    let mut stmt = conn.prepare(
        "SELECT q.id, q.post_id, q.questions, q.attempts, q.successes
         FROM quizzes q JOIN posts p ON p.id = q.post_id
         WHERE p.author_id = ?1 ORDER BY q.id",
    )?;
    let rows = stmt.query_map([author_id], |row| {
        Ok(Quiz {
            id: row.get(0)?,
            post_id: row.get(1)?,
            questions: row.get(2)?,
            attempts: row.get(3)?,
            successes: row.get(4)?,
        })
    })?;
    rows.collect()
}

/// Counters only ever go up; interaction events are the sole mutation path.
pub fn increment_quiz_attempts(conn: &Connection, quiz_id: i64) -> RusqliteResult<()> {
    conn.execute(
        "UPDATE quizzes SET attempts = attempts + 1 WHERE id = ?1",
        [quiz_id],
    )?;
    Ok(())
}

pub fn increment_quiz_successes(conn: &Connection, quiz_id: i64) -> RusqliteResult<()> {
    conn.execute(
        "UPDATE quizzes SET successes = successes + 1 WHERE id = ?1",
        [quiz_id],
    )?;
    Ok(())
}

pub fn create_chart(
    conn: &Connection,
    post_id: i64,
    chart_type: &str,
    data: &serde_json::Value,
) -> RusqliteResult<i64> {
    conn.execute(
        "INSERT INTO charts (post_id, chart_type, data) VALUES (?1, ?2, ?3)",
        params![post_id, chart_type, data],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_chart(conn: &Connection, chart_id: i64) -> RusqliteResult<Option<Chart>> {
    conn.query_row(
        "SELECT id, post_id, chart_type, data FROM charts WHERE id = ?1",
        [chart_id],
        |row| {
            Ok(Chart {
                id: row.get(0)?,
                post_id: row.get(1)?,
                chart_type: row.get(2)?,
                data: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn create_video(
    conn: &Connection,
    post_id: i64,
    url: &str,
    filename: Option<&str>,
    now: DateTime<Utc>,
) -> RusqliteResult<i64> {
    conn.execute(
        "INSERT INTO videos (post_id, url, filename, uploaded_at) VALUES (?1, ?2, ?3, ?4)",
        params![post_id, url, filename, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_video(conn: &Connection, video_id: i64) -> RusqliteResult<Option<Video>> {
    conn.query_row(
        "SELECT id, post_id, url, filename, uploaded_at FROM videos WHERE id = ?1",
        [video_id],
        |row| {
            Ok(Video {
                id: row.get(0)?,
                post_id: row.get(1)?,
                url: row.get(2)?,
                filename: row.get(3)?,
                uploaded_at: row.get(4)?,
            })
        },
    )
    .optional()
}

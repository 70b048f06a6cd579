use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Creates the full blog schema inside one transaction. Safe to re-run:
/// every statement is `IF NOT EXISTS`.
pub fn setup_blog_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;

    println!("- Creating 'users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin', 'author')) DEFAULT 'author',
            failed_attempts INTEGER NOT NULL DEFAULT 0,
            last_attempt TEXT
        )",
        [],
    )?;

    println!("- Creating 'posts' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('draft', 'published')) DEFAULT 'draft',
            categories TEXT NOT NULL DEFAULT '[]',
            tags TEXT NOT NULL DEFAULT '[]',
            views INTEGER NOT NULL DEFAULT 0,
            published_at TEXT,
            author_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (author_id) REFERENCES users(id)
        )",
        [],
    )?;

    println!("- Creating 'revisions' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS revisions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL,
            content TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            FOREIGN KEY (post_id) REFERENCES posts(id)
        )",
        [],
    )?;

    println!("- Creating 'quizzes' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS quizzes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL,
            questions TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            successes INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (post_id) REFERENCES posts(id)
        )",
        [],
    )?;

    println!("- Creating 'charts' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS charts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL,
            chart_type TEXT NOT NULL,
            data TEXT NOT NULL,
            FOREIGN KEY (post_id) REFERENCES posts(id)
        )",
        [],
    )?;

    println!("- Creating 'videos' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL,
            url TEXT NOT NULL,
            filename TEXT,
            uploaded_at TEXT NOT NULL,
            FOREIGN KEY (post_id) REFERENCES posts(id)
        )",
        [],
    )?;

    println!("- Creating 'analytics_logs' table...");
    // post_id 0 is the sentinel for platform-level events, so no FK here.
    tx.execute(
        "CREATE TABLE IF NOT EXISTS analytics_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL,
            event_type TEXT NOT NULL CHECK(event_type IN
                ('view', 'login_success', 'login_failed', 'quiz_attempt', 'quiz_success')),
            ip_address TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'blocked_ips' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS blocked_ips (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ip_address TEXT NOT NULL UNIQUE,
            blocked_at TEXT NOT NULL,
            reason TEXT NOT NULL DEFAULT 'Failed login attempts'
        )",
        [],
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_revisions_post ON revisions(post_id)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_analytics_event ON analytics_logs(event_type, timestamp)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status, published_at)",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

use crate::models::{BlockedIp, User};
use bcrypt::{hash, verify, BcryptError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Result as RusqliteResult};

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

pub fn create_user(
    conn: &Connection,
    username: &str,
    password: &str,
    role: &str,
) -> RusqliteResult<i64> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
        params![username, hashed_password, role],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_all_users(conn: &Connection) -> RusqliteResult<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, role, failed_attempts, last_attempt FROM users ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            role: row.get(2)?,
            failed_attempts: row.get(3)?,
            last_attempt: row.get(4)?,
        })
    })?;
    rows.collect()
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> RusqliteResult<Option<User>> {
    conn.query_row(
        "SELECT id, username, role, failed_attempts, last_attempt FROM users WHERE username = ?1",
        [username],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                role: row.get(2)?,
                failed_attempts: row.get(3)?,
                last_attempt: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn delete_user(conn: &Connection, user_id: i64) -> RusqliteResult<usize> {
    conn.execute("DELETE FROM users WHERE id = ?1", [user_id])
}

/// Compares a cleartext password against the stored hash. The hash never
/// leaves this function and is never logged.
pub fn verify_password(conn: &Connection, user_id: i64, password: &str) -> RusqliteResult<bool> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        Some(hash) => Ok(verify(password, &hash).unwrap_or(false)),
        None => Ok(false),
    }
}

/// Atomic increment-and-read, so concurrent failures from the same address
/// cannot lose updates before the threshold comparison.
pub fn record_failed_attempt(
    conn: &Connection,
    user_id: i64,
    now: DateTime<Utc>,
) -> RusqliteResult<i64> {
    conn.query_row(
        "UPDATE users SET failed_attempts = failed_attempts + 1, last_attempt = ?1
         WHERE id = ?2 RETURNING failed_attempts",
        params![now, user_id],
        |row| row.get(0),
    )
}

/// The counter resets to zero exactly on successful authentication.
pub fn reset_failed_attempts(
    conn: &Connection,
    user_id: i64,
    now: DateTime<Utc>,
) -> RusqliteResult<()> {
    conn.execute(
        "UPDATE users SET failed_attempts = 0, last_attempt = ?1 WHERE id = ?2",
        params![now, user_id],
    )?;
    Ok(())
}

pub fn is_ip_blocked(conn: &Connection, ip_address: &str) -> RusqliteResult<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM blocked_ips WHERE ip_address = ?1)",
        [ip_address],
        |row| row.get(0),
    )
}

/// Idempotent get-or-create: a second threshold crossing from the same
/// address must not create a duplicate row.
pub fn block_ip(
    conn: &Connection,
    ip_address: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> RusqliteResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO blocked_ips (ip_address, blocked_at, reason) VALUES (?1, ?2, ?3)",
        params![ip_address, now, reason],
    )?;
    Ok(())
}

pub fn read_blocked_ips(conn: &Connection) -> RusqliteResult<Vec<BlockedIp>> {
    let mut stmt = conn.prepare(
        "SELECT id, ip_address, blocked_at, reason FROM blocked_ips ORDER BY blocked_at DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(BlockedIp {
            id: row.get(0)?,
            ip_address: row.get(1)?,
            blocked_at: row.get(2)?,
            reason: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Administrative removal, the only way out of a block.
pub fn unblock_ip(conn: &Connection, ip_address: &str) -> RusqliteResult<usize> {
    conn.execute("DELETE FROM blocked_ips WHERE ip_address = ?1", [ip_address])
}

use crate::models::db_operations::{analytics_db_operations, users_db_operations};
use crate::models::EventKind;
use chrono::Utc;
use rusqlite::{Connection, Result as RusqliteResult};

/// Failed attempts at which the requesting address gets blocked.
pub const FAILED_ATTEMPT_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The origin address is on the block list; credentials were never
    /// compared and no counter changed.
    BlockedOrigin,
    Success {
        user_id: i64,
        username: String,
        role: String,
    },
    InvalidCredentials,
    /// This attempt crossed the threshold: the address is now blocked.
    LockedOut,
}

/// Audit writes are fire-and-forget: a failed insert must never abort the
/// login attempt it describes.
fn audit(conn: &Connection, event: EventKind, ip_address: &str) {
    if let Err(e) = analytics_db_operations::append_event(
        conn,
        analytics_db_operations::PLATFORM_EVENT_POST_ID,
        event,
        ip_address,
        Utc::now(),
    ) {
        log::warn!("Failed to write login audit entry: {}", e);
    }
}

/// Runs one login attempt through the throttle state machine. Storage
/// errors propagate; everything else is expressed in the outcome. The
/// cleartext password goes into `bcrypt::verify` and nowhere else.
pub fn handle_login_attempt(
    conn: &Connection,
    username: &str,
    password: &str,
    ip_address: &str,
) -> RusqliteResult<LoginOutcome> {
    if users_db_operations::is_ip_blocked(conn, ip_address)? {
        audit(conn, EventKind::LoginFailed, ip_address);
        return Ok(LoginOutcome::BlockedOrigin);
    }

    let user = match users_db_operations::read_user_by_username(conn, username)? {
        Some(user) => user,
        None => {
            // Same response as a wrong password: usernames are not probeable.
            audit(conn, EventKind::LoginFailed, ip_address);
            return Ok(LoginOutcome::InvalidCredentials);
        }
    };

    let now = Utc::now();
    if users_db_operations::verify_password(conn, user.id, password)? {
        users_db_operations::reset_failed_attempts(conn, user.id, now)?;
        audit(conn, EventKind::LoginSuccess, ip_address);
        return Ok(LoginOutcome::Success {
            user_id: user.id,
            username: user.username,
            role: user.role,
        });
    }

    let attempts = users_db_operations::record_failed_attempt(conn, user.id, now)?;
    audit(conn, EventKind::LoginFailed, ip_address);

    if attempts >= FAILED_ATTEMPT_THRESHOLD {
        let reason = format!("Multiple failed login attempts for user {}", user.username);
        users_db_operations::block_ip(conn, ip_address, &reason, now)?;
        log::warn!(
            "Blocked address {} after {} failed attempts for user {}.",
            ip_address,
            attempts,
            user.username
        );
        return Ok(LoginOutcome::LockedOut);
    }

    Ok(LoginOutcome::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::users_db_operations::{create_user, read_user_by_username};
    use crate::setup::db_setup;

    const IP: &str = "203.0.113.7";

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().expect("in-memory db");
        db_setup::setup_blog_db(&mut conn).expect("schema");
        create_user(&conn, "alice", "correct horse", "author").expect("user");
        conn
    }

    fn failed_login_audit_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM analytics_logs WHERE event_type = 'login_failed'",
            [],
            |row| row.get(0),
        )
        .expect("count")
    }

    #[test]
    fn correct_credentials_succeed_and_reset_counter() {
        let conn = test_conn();
        for _ in 0..3 {
            let outcome = handle_login_attempt(&conn, "alice", "wrong", IP).expect("attempt");
            assert_eq!(outcome, LoginOutcome::InvalidCredentials);
        }

        let outcome = handle_login_attempt(&conn, "alice", "correct horse", IP).expect("attempt");
        assert!(matches!(outcome, LoginOutcome::Success { ref username, .. } if username == "alice"));

        let user = read_user_by_username(&conn, "alice").expect("read").expect("some");
        assert_eq!(user.failed_attempts, 0);
    }

    #[test]
    fn fifth_failure_locks_out_and_blocks_address_once() {
        let conn = test_conn();
        for i in 1..=4 {
            let outcome = handle_login_attempt(&conn, "alice", "wrong", IP).expect("attempt");
            assert_eq!(outcome, LoginOutcome::InvalidCredentials, "attempt {i}");
        }
        let outcome = handle_login_attempt(&conn, "alice", "wrong", IP).expect("attempt");
        assert_eq!(outcome, LoginOutcome::LockedOut);

        let blocked: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM blocked_ips WHERE ip_address = ?1",
                [IP],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(blocked, 1);
    }

    #[test]
    fn blocked_origin_is_rejected_before_credential_comparison() {
        let conn = test_conn();
        for _ in 0..5 {
            handle_login_attempt(&conn, "alice", "wrong", IP).expect("attempt");
        }

        // Even the correct password is refused from a blocked address, and
        // the user's counter no longer moves.
        let before = read_user_by_username(&conn, "alice").expect("read").expect("some");
        let outcome =
            handle_login_attempt(&conn, "alice", "correct horse", IP).expect("attempt");
        assert_eq!(outcome, LoginOutcome::BlockedOrigin);
        let after = read_user_by_username(&conn, "alice").expect("read").expect("some");
        assert_eq!(before.failed_attempts, after.failed_attempts);
    }

    #[test]
    fn blocked_origin_attempts_are_still_audited() {
        let conn = test_conn();
        for _ in 0..5 {
            handle_login_attempt(&conn, "alice", "wrong", IP).expect("attempt");
        }
        let before = failed_login_audit_count(&conn);
        handle_login_attempt(&conn, "alice", "wrong", IP).expect("attempt");
        assert_eq!(failed_login_audit_count(&conn), before + 1);
    }

    #[test]
    fn unknown_username_gets_generic_response() {
        let conn = test_conn();
        let outcome = handle_login_attempt(&conn, "mallory", "anything", IP).expect("attempt");
        assert_eq!(outcome, LoginOutcome::InvalidCredentials);
        assert_eq!(failed_login_audit_count(&conn), 1);

        let blocked: i64 = conn
            .query_row("SELECT COUNT(*) FROM blocked_ips", [], |row| row.get(0))
            .expect("count");
        assert_eq!(blocked, 0);
    }

    #[test]
    fn repeated_threshold_crossings_do_not_duplicate_block() {
        let conn = test_conn();
        create_user(&conn, "bob", "pw", "author").expect("user");
        for _ in 0..5 {
            handle_login_attempt(&conn, "alice", "wrong", IP).expect("attempt");
        }
        // The address is already blocked; a different user cannot trip a
        // second row for it.
        let outcome = handle_login_attempt(&conn, "bob", "wrong", IP).expect("attempt");
        assert_eq!(outcome, LoginOutcome::BlockedOrigin);

        let blocked: i64 = conn
            .query_row("SELECT COUNT(*) FROM blocked_ips", [], |row| row.get(0))
            .expect("count");
        assert_eq!(blocked, 1);
    }

    #[test]
    fn admin_unblock_reopens_the_address() {
        let conn = test_conn();
        for _ in 0..5 {
            handle_login_attempt(&conn, "alice", "wrong", IP).expect("attempt");
        }
        assert_eq!(
            handle_login_attempt(&conn, "alice", "correct horse", IP).expect("attempt"),
            LoginOutcome::BlockedOrigin
        );

        users_db_operations::unblock_ip(&conn, IP).expect("unblock");
        let outcome = handle_login_attempt(&conn, "alice", "correct horse", IP).expect("attempt");
        assert!(matches!(outcome, LoginOutcome::Success { .. }));
    }
}

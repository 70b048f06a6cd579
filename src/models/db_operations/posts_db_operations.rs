use crate::models::{Post, PostStatus, Revision};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as RusqliteResult, Row};

const POST_COLUMNS: &str = "id, title, slug, content, status, categories, tags, views, \
                            published_at, author_id, created_at, updated_at";

fn row_to_post(row: &Row) -> RusqliteResult<Post> {
    let status_str: String = row.get(4)?;
    let categories_json: String = row.get(5)?;
    let tags_json: String = row.get(6)?;
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        status: PostStatus::parse(&status_str).unwrap_or(PostStatus::Draft),
        categories: serde_json::from_str(&categories_json).unwrap_or_default(),
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        views: row.get(7)?,
        published_at: row.get(8)?,
        author_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub fn create_post(
    conn: &Connection,
    author_id: i64,
    title: &str,
    slug: &str,
    content: &str,
    status: PostStatus,
    now: DateTime<Utc>,
) -> RusqliteResult<i64> {
    conn.execute(
        "INSERT INTO posts (title, slug, content, status, author_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![title, slug, content, status.as_str(), author_id, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_post_by_id(conn: &Connection, post_id: i64) -> RusqliteResult<Option<Post>> {
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
        [post_id],
        row_to_post,
    )
    .optional()
}

pub fn read_published_post_by_slug(conn: &Connection, slug: &str) -> RusqliteResult<Option<Post>> {
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE slug = ?1 AND status = 'published'"),
        [slug],
        row_to_post,
    )
    .optional()
}

pub fn read_published_posts(
    conn: &Connection,
    limit: u32,
    offset: u32,
) -> RusqliteResult<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE status = 'published'
         ORDER BY published_at DESC LIMIT ?1 OFFSET ?2"
    ))?;
    let rows = stmt.query_map(params![limit, offset], row_to_post)?;
    rows.collect()
}

/// Published posts whose JSON `categories` array contains `category`.
pub fn read_published_posts_by_category(
    conn: &Connection,
    category: &str,
    limit: u32,
    offset: u32,
) -> RusqliteResult<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts
         WHERE status = 'published'
           AND EXISTS (SELECT 1 FROM json_each(posts.categories) WHERE json_each.value = ?1)
         ORDER BY published_at DESC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![category, limit, offset], row_to_post)?;
    rows.collect()
}

pub fn read_published_posts_by_tag(
    conn: &Connection,
    tag: &str,
    limit: u32,
    offset: u32,
) -> RusqliteResult<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts
         WHERE status = 'published'
           AND EXISTS (SELECT 1 FROM json_each(posts.tags) WHERE json_each.value = ?1)
         ORDER BY published_at DESC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![tag, limit, offset], row_to_post)?;
    rows.collect()
}

pub fn read_posts_by_author(conn: &Connection, author_id: i64) -> RusqliteResult<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ?1 ORDER BY updated_at DESC"
    ))?;
    let rows = stmt.query_map([author_id], row_to_post)?;
    rows.collect()
}

/// Uniqueness oracle for the slug assigner. Always queries the live table
/// so candidate checks reflect concurrent inserts.
pub fn slug_exists(conn: &Connection, candidate: &str) -> RusqliteResult<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1)",
        [candidate],
        |row| row.get(0),
    )
}

/// The slug is deliberately not touched here: once assigned it is immutable.
pub fn update_post_content(
    conn: &Connection,
    post_id: i64,
    title: &str,
    content: &str,
    status: PostStatus,
    now: DateTime<Utc>,
) -> RusqliteResult<()> {
    conn.execute(
        "UPDATE posts SET title = ?1, content = ?2, status = ?3, updated_at = ?4 WHERE id = ?5",
        params![title, content, status.as_str(), now, post_id],
    )?;
    Ok(())
}

pub fn set_published_at(
    conn: &Connection,
    post_id: i64,
    published_at: DateTime<Utc>,
) -> RusqliteResult<()> {
    conn.execute(
        "UPDATE posts SET published_at = ?1 WHERE id = ?2 AND published_at IS NULL",
        params![published_at, post_id],
    )?;
    Ok(())
}

pub fn update_classification(
    conn: &Connection,
    post_id: i64,
    categories: &[String],
    tags: &[String],
) -> RusqliteResult<()> {
    let categories_json = serde_json::to_string(categories).unwrap_or_else(|_| "[]".to_string());
    let tags_json = serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "UPDATE posts SET categories = ?1, tags = ?2 WHERE id = ?3",
        params![categories_json, tags_json, post_id],
    )?;
    Ok(())
}

pub fn increment_views(conn: &Connection, post_id: i64) -> RusqliteResult<()> {
    conn.execute("UPDATE posts SET views = views + 1 WHERE id = ?1", [post_id])?;
    Ok(())
}

pub fn create_revision(
    conn: &Connection,
    post_id: i64,
    content: &str,
    now: DateTime<Utc>,
) -> RusqliteResult<i64> {
    conn.execute(
        "INSERT INTO revisions (post_id, content, timestamp) VALUES (?1, ?2, ?3)",
        params![post_id, content, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_revisions(conn: &Connection, post_id: i64) -> RusqliteResult<Vec<Revision>> {
    let mut stmt = conn.prepare(
        "SELECT id, post_id, content, timestamp FROM revisions
         WHERE post_id = ?1 ORDER BY timestamp, id",
    )?;
    let rows = stmt.query_map([post_id], |row| {
        Ok(Revision {
            id: row.get(0)?,
            post_id: row.get(1)?,
            content: row.get(2)?,
            timestamp: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Explicit owning-entity deletion: removes every dependent record and the
/// post itself in one transaction, leaving no orphans.
pub fn delete_post_cascade(conn: &mut Connection, post_id: i64) -> RusqliteResult<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM revisions WHERE post_id = ?1", [post_id])?;
    tx.execute("DELETE FROM quizzes WHERE post_id = ?1", [post_id])?;
    tx.execute("DELETE FROM charts WHERE post_id = ?1", [post_id])?;
    tx.execute("DELETE FROM videos WHERE post_id = ?1", [post_id])?;
    tx.execute("DELETE FROM analytics_logs WHERE post_id = ?1", [post_id])?;
    tx.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::{
        analytics_db_operations, users_db_operations, widgets_db_operations,
    };
    use crate::models::EventKind;
    use crate::setup::db_setup;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().expect("in-memory db");
        db_setup::setup_blog_db(&mut conn).expect("schema");
        users_db_operations::create_user(&conn, "alice", "secret", "author").expect("user");
        conn
    }

    fn make_post(conn: &Connection, slug: &str) -> i64 {
        create_post(
            conn,
            1,
            "Title",
            slug,
            "Body",
            PostStatus::Draft,
            Utc::now(),
        )
        .expect("create post")
    }

    #[test]
    fn create_and_read_back() {
        let conn = test_conn();
        let id = make_post(&conn, "title");
        let post = read_post_by_id(&conn, id).expect("read").expect("some");
        assert_eq!(post.slug, "title");
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.views, 0);
        assert!(post.published_at.is_none());
        assert!(post.categories.is_empty());
    }

    #[test]
    fn slug_uniqueness_is_enforced() {
        let conn = test_conn();
        make_post(&conn, "dup");
        let res = create_post(
            &conn,
            1,
            "Other",
            "dup",
            "Body",
            PostStatus::Draft,
            Utc::now(),
        );
        assert!(res.is_err());
        assert!(slug_exists(&conn, "dup").expect("exists"));
        assert!(!slug_exists(&conn, "free").expect("exists"));
    }

    #[test]
    fn published_at_is_set_exactly_once() {
        let conn = test_conn();
        let id = make_post(&conn, "once");
        let first = Utc::now();
        set_published_at(&conn, id, first).expect("publish");
        let later = first + chrono::Duration::hours(1);
        set_published_at(&conn, id, later).expect("republish");

        let post = read_post_by_id(&conn, id).expect("read").expect("some");
        assert_eq!(post.published_at, Some(first));
    }

    #[test]
    fn revisions_are_append_only_and_ordered() {
        let conn = test_conn();
        let id = make_post(&conn, "rev");
        let t0 = Utc::now();
        create_revision(&conn, id, "v1", t0).expect("rev1");
        create_revision(&conn, id, "v2", t0 + chrono::Duration::seconds(1)).expect("rev2");

        let revisions = read_revisions(&conn, id).expect("read");
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0].content, "v1");
        assert_eq!(revisions[1].content, "v2");
    }

    #[test]
    fn category_and_tag_filters_use_json_membership() {
        let conn = test_conn();
        let id = make_post(&conn, "classified");
        update_classification(
            &conn,
            id,
            &["Technology".to_string()],
            &["web".to_string(), "tips".to_string()],
        )
        .expect("classify");
        conn.execute(
            "UPDATE posts SET status = 'published', published_at = ?1 WHERE id = ?2",
            params![Utc::now(), id],
        )
        .expect("force publish");

        let by_cat =
            read_published_posts_by_category(&conn, "Technology", 10, 0).expect("by category");
        assert_eq!(by_cat.len(), 1);
        let by_tag = read_published_posts_by_tag(&conn, "tips", 10, 0).expect("by tag");
        assert_eq!(by_tag.len(), 1);
        let none = read_published_posts_by_tag(&conn, "Technology", 10, 0).expect("no match");
        assert!(none.is_empty());
    }

    #[test]
    fn cascade_delete_leaves_no_orphans() {
        let mut conn = test_conn();
        let id = make_post(&conn, "doomed");
        create_revision(&conn, id, "v1", Utc::now()).expect("rev");
        widgets_db_operations::create_quiz(&conn, id, &serde_json::json!([{"q": "?"}]))
            .expect("quiz");
        widgets_db_operations::create_chart(&conn, id, "bar", &serde_json::json!({"labels": []}))
            .expect("chart");
        widgets_db_operations::create_video(&conn, id, "/static/v.mp4", Some("v.mp4"), Utc::now())
            .expect("video");
        analytics_db_operations::append_event(&conn, id, EventKind::View, "10.0.0.1", Utc::now())
            .expect("event");

        delete_post_cascade(&mut conn, id).expect("cascade");

        for table in ["revisions", "quizzes", "charts", "videos", "analytics_logs"] {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE post_id = ?1"),
                    [id],
                    |row| row.get(0),
                )
                .expect("count");
            assert_eq!(count, 0, "orphans left in {table}");
        }
        assert!(read_post_by_id(&conn, id).expect("read").is_none());
    }
}

use crate::helper::classify_helpers::TagClassifier;
use crate::helper::sanitization_helpers::{self, TITLE_ALLOWED_TAGS};
use crate::helper::slug_helpers;
use crate::models::db_operations::posts_db_operations;
use crate::models::{Post, PostStatus};
use crate::DbPool;
use chrono::Utc;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("post not found")]
    PostNotFound,
    #[error("another post claimed this slug concurrently; retry the save")]
    SlugConflict,
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("connection pool failure: {0}")]
    Pool(#[from] r2d2::Error),
}

#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
}

/// The slug uniqueness search re-checks the live table, but a concurrent
/// insert can still win the race; the unique index turns that into a
/// constraint violation we surface as a retryable conflict.
fn is_slug_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, Some(msg)) => {
            err.code == ErrorCode::ConstraintViolation && msg.contains("posts.slug")
        }
        _ => false,
    }
}

/// Saves a post through the publishing pipeline. With `post_id` absent a
/// new post is created (slug assigned from the title, once, immutably);
/// otherwise the author's existing post is updated.
///
/// Rules on every save: the title is sanitized down to inline emphasis,
/// the body is persisted as authored, `updated_at` moves. On the first
/// entry to published: `published_at` is set, the classifier runs (total:
/// a collaborator failure ends in the keyword fallback, never a failed
/// publish) and its result is stored. Every publish-time save appends a
/// revision snapshot. Re-edits after the first publish never re-classify
/// and never move `published_at`.
///
/// Classification is awaited before the write transaction opens so no
/// database lock is held across the network call; all writes then commit
/// atomically, and a storage failure rolls the whole save back.
pub async fn save_post(
    pool: &DbPool,
    classifier: &TagClassifier,
    author_id: i64,
    post_id: Option<i64>,
    input: &PostInput,
) -> Result<Post, PublishError> {
    let mut conn = pool.get()?;

    let title = sanitization_helpers::sanitize_html(&input.title, Some(TITLE_ALLOWED_TAGS));

    let existing = match post_id {
        Some(id) => {
            let post = posts_db_operations::read_post_by_id(&conn, id)?
                .filter(|p| p.author_id == author_id)
                .ok_or(PublishError::PostNotFound)?;
            Some(post)
        }
        None => None,
    };

    let publishing = input.status == PostStatus::Published;
    let first_publish =
        publishing && existing.as_ref().map_or(true, |p| p.published_at.is_none());

    let classification = if first_publish {
        Some(classifier.classify(&input.content).await)
    } else {
        None
    };

    let now = Utc::now();
    let tx = conn.transaction()?;

    let id = match &existing {
        Some(post) => {
            posts_db_operations::update_post_content(
                &tx,
                post.id,
                &title,
                &input.content,
                input.status,
                now,
            )?;
            post.id
        }
        None => {
            // Slug comes from the plain text of the title, not its markup.
            let plain_title = sanitization_helpers::strip_all_html(&input.title);
            let slug =
                slug_helpers::assign_slug(&plain_title, |c| {
                    posts_db_operations::slug_exists(&tx, c)
                })?;
            posts_db_operations::create_post(
                &tx,
                author_id,
                &title,
                &slug,
                &input.content,
                input.status,
                now,
            )
            .map_err(|e| {
                if is_slug_unique_violation(&e) {
                    PublishError::SlugConflict
                } else {
                    PublishError::Storage(e)
                }
            })?
        }
    };

    if publishing {
        if first_publish {
            posts_db_operations::set_published_at(&tx, id, now)?;
            if let Some(result) = &classification {
                posts_db_operations::update_classification(
                    &tx,
                    id,
                    &result.categories,
                    &result.tags,
                )?;
            }
        }
        posts_db_operations::create_revision(&tx, id, &input.content, now)?;
    }

    tx.commit()?;

    posts_db_operations::read_post_by_id(&conn, id)?.ok_or(PublishError::PostNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::users_db_operations;
    use crate::setup::db_setup;
    use r2d2_sqlite::SqliteConnectionManager;

    // max_size 1 keeps every pooled checkout on the same in-memory database.
    fn test_pool() -> DbPool {
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())
            .expect("pool");
        {
            let mut conn = pool.get().expect("conn");
            db_setup::setup_blog_db(&mut conn).expect("schema");
            users_db_operations::create_user(&conn, "alice", "pw", "author").expect("user");
        }
        pool
    }

    fn input(title: &str, content: &str, status: PostStatus) -> PostInput {
        PostInput {
            title: title.to_string(),
            content: content.to_string(),
            status,
        }
    }

    fn revision_count(pool: &DbPool, post_id: i64) -> i64 {
        pool.get()
            .expect("conn")
            .query_row(
                "SELECT COUNT(*) FROM revisions WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )
            .expect("count")
    }

    #[actix_web::test]
    async fn draft_save_assigns_slug_but_no_revision() {
        let pool = test_pool();
        let classifier = TagClassifier::disabled();

        let post = save_post(
            &pool,
            &classifier,
            1,
            None,
            &input("My First Post", "Hello", PostStatus::Draft),
        )
        .await
        .expect("save");

        assert_eq!(post.slug, "my-first-post");
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.published_at.is_none());
        assert!(post.categories.is_empty());
        assert_eq!(revision_count(&pool, post.id), 0);
    }

    #[actix_web::test]
    async fn first_publish_sets_published_at_classifies_and_snapshots() {
        let pool = test_pool();
        let classifier = TagClassifier::disabled();

        let post = save_post(
            &pool,
            &classifier,
            1,
            None,
            &input("Web Guide", "a web programming tutorial", PostStatus::Published),
        )
        .await
        .expect("publish");

        assert!(post.published_at.is_some());
        assert_eq!(post.categories, vec!["Technology", "Tutorial"]);
        assert!(!post.tags.is_empty());
        assert_eq!(revision_count(&pool, post.id), 1);
    }

    #[actix_web::test]
    async fn republish_appends_revision_without_moving_published_at() {
        let pool = test_pool();
        let classifier = TagClassifier::disabled();

        let post = save_post(
            &pool,
            &classifier,
            1,
            None,
            &input("Title", "v1", PostStatus::Published),
        )
        .await
        .expect("publish");
        let first_published_at = post.published_at;
        let first_categories = post.categories.clone();

        let updated = save_post(
            &pool,
            &classifier,
            1,
            Some(post.id),
            &input("Title", "v2 with fresh opinion thoughts", PostStatus::Published),
        )
        .await
        .expect("republish");

        assert_eq!(updated.published_at, first_published_at);
        // Re-edits never re-run classification, even when content changes.
        assert_eq!(updated.categories, first_categories);
        assert_eq!(updated.content, "v2 with fresh opinion thoughts");
        assert_eq!(revision_count(&pool, post.id), 2);
    }

    #[actix_web::test]
    async fn colliding_titles_get_distinct_slugs() {
        let pool = test_pool();
        let classifier = TagClassifier::disabled();

        let a = save_post(&pool, &classifier, 1, None, &input("Same Name", "a", PostStatus::Draft))
            .await
            .expect("first");
        let b = save_post(&pool, &classifier, 1, None, &input("Same Name!", "b", PostStatus::Draft))
            .await
            .expect("second");

        assert_eq!(a.slug, "same-name");
        assert_eq!(b.slug, "same-name-1");
    }

    #[actix_web::test]
    async fn title_is_reduced_to_inline_emphasis() {
        let pool = test_pool();
        let classifier = TagClassifier::disabled();

        let post = save_post(
            &pool,
            &classifier,
            1,
            None,
            &input(
                "<script>alert(1)</script>My <em>Fancy</em> <h1>Title</h1>",
                "body",
                PostStatus::Draft,
            ),
        )
        .await
        .expect("save");

        assert_eq!(post.title, "My <em>Fancy</em> Title");
        assert_eq!(post.slug, "my-fancy-title");
    }

    #[actix_web::test]
    async fn slug_is_immutable_across_edits() {
        let pool = test_pool();
        let classifier = TagClassifier::disabled();

        let post = save_post(&pool, &classifier, 1, None, &input("Original", "a", PostStatus::Draft))
            .await
            .expect("save");
        let updated = save_post(
            &pool,
            &classifier,
            1,
            Some(post.id),
            &input("Renamed Completely", "a", PostStatus::Draft),
        )
        .await
        .expect("edit");

        assert_eq!(updated.slug, "original");
        assert_eq!(updated.title, "Renamed Completely");
    }

    #[actix_web::test]
    async fn updated_at_moves_on_every_save() {
        let pool = test_pool();
        let classifier = TagClassifier::disabled();

        let post = save_post(&pool, &classifier, 1, None, &input("T", "a", PostStatus::Draft))
            .await
            .expect("save");
        let edited = save_post(
            &pool,
            &classifier,
            1,
            Some(post.id),
            &input("T", "b", PostStatus::Draft),
        )
        .await
        .expect("edit");

        assert!(edited.updated_at > post.updated_at);
        assert_eq!(edited.created_at, post.created_at);
    }

    #[actix_web::test]
    async fn foreign_posts_are_invisible_to_other_authors() {
        let pool = test_pool();
        let classifier = TagClassifier::disabled();
        {
            let conn = pool.get().expect("conn");
            users_db_operations::create_user(&conn, "bob", "pw", "author").expect("user");
        }

        let post = save_post(&pool, &classifier, 1, None, &input("Mine", "a", PostStatus::Draft))
            .await
            .expect("save");

        let res = save_post(
            &pool,
            &classifier,
            2,
            Some(post.id),
            &input("Hijack", "b", PostStatus::Draft),
        )
        .await;
        assert!(matches!(res, Err(PublishError::PostNotFound)));
    }

    #[actix_web::test]
    async fn missing_post_is_an_error() {
        let pool = test_pool();
        let classifier = TagClassifier::disabled();
        let res = save_post(&pool, &classifier, 1, Some(999), &input("T", "c", PostStatus::Draft))
            .await;
        assert!(matches!(res, Err(PublishError::PostNotFound)));
    }

    #[test]
    fn unique_violation_detection_matches_real_error() {
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder().max_size(1).build(manager).expect("pool");
        let mut conn = pool.get().expect("conn");
        db_setup::setup_blog_db(&mut conn).expect("schema");
        users_db_operations::create_user(&conn, "alice", "pw", "author").expect("user");

        posts_db_operations::create_post(
            &conn, 1, "T", "taken", "c", PostStatus::Draft, Utc::now(),
        )
        .expect("first insert");
        let err = posts_db_operations::create_post(
            &conn, 1, "T", "taken", "c", PostStatus::Draft, Utc::now(),
        )
        .expect_err("duplicate insert");

        assert!(is_slug_unique_violation(&err));
        assert!(!is_slug_unique_violation(&rusqlite::Error::QueryReturnedNoRows));
    }
}

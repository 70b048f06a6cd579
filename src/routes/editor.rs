use crate::helper::analytics_helpers;
use crate::helper::classify_helpers::TagClassifier;
use crate::helper::publish_helpers::{self, PostInput, PublishError};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{posts_db_operations, widgets_db_operations};
use crate::models::{PostStatus, WidgetKind};
use crate::DbPool;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

pub fn config_editor(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/editor")
            .route("/posts", web::get().to(list_my_posts))
            .route("/posts", web::post().to(save_post_action))
            .route("/posts/{id}/publish", web::post().to(publish_post_action))
            .route("/posts/{id}/revisions", web::get().to(list_revisions))
            .route("/posts/{id}", web::delete().to(delete_post_action))
            .route("/quizzes", web::post().to(create_quiz_action))
            .route("/charts", web::post().to(create_chart_action))
            .route("/videos", web::post().to(create_video_action))
            .route("/dashboard", web::get().to(dashboard_summary_action))
            .route("/dashboard/analytics", web::get().to(dashboard_analytics_action)),
    );
}

fn publish_error_response(e: PublishError) -> HttpResponse {
    match e {
        PublishError::PostNotFound => HttpResponse::NotFound().json(json!({
            "status": "error",
            "message": "Post not found."
        })),
        PublishError::SlugConflict => HttpResponse::Conflict().json(json!({
            "status": "error",
            "message": "Slug was taken concurrently. Retry the save."
        })),
        PublishError::Storage(e) => {
            log::error!("Storage failure while saving post: {}", e);
            HttpResponse::InternalServerError().finish()
        }
        PublishError::Pool(e) => {
            log::error!("Connection pool failure while saving post: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Deserialize)]
struct SavePostRequest {
    post_id: Option<i64>,
    title: String,
    content: String,
    status: PostStatus,
}

async fn list_my_posts(user: AuthenticatedUser, pool: web::Data<DbPool>) -> impl Responder {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match posts_db_operations::read_posts_by_author(&conn, user.user_id) {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => {
            log::error!("Failed to list posts for {}: {}", user.username, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Create-or-update through the publishing pipeline. Saving with status
/// `draft` is the autosave path; saving with `published` publishes.
async fn save_post_action(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    classifier: web::Data<TagClassifier>,
    payload: web::Json<SavePostRequest>,
) -> impl Responder {
    if payload.title.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": "Title must not be empty."
        }));
    }

    let input = PostInput {
        title: payload.title.clone(),
        content: payload.content.clone(),
        status: payload.status,
    };
    match publish_helpers::save_post(&pool, &classifier, user.user_id, payload.post_id, &input)
        .await
    {
        Ok(post) => HttpResponse::Ok().json(post),
        Err(e) => publish_error_response(e),
    }
}

/// Publishes an existing post as-is (title/content untouched).
async fn publish_post_action(
    user: AuthenticatedUser,
    post_id: web::Path<i64>,
    pool: web::Data<DbPool>,
    classifier: web::Data<TagClassifier>,
) -> impl Responder {
    let existing = {
        let conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("Failed to get DB connection: {}", e);
                return HttpResponse::InternalServerError().finish();
            }
        };
        match posts_db_operations::read_post_by_id(&conn, *post_id) {
            Ok(Some(post)) if post.author_id == user.user_id => post,
            Ok(_) => return publish_error_response(PublishError::PostNotFound),
            Err(e) => return publish_error_response(PublishError::Storage(e)),
        }
    };

    let input = PostInput {
        title: existing.title.clone(),
        content: existing.content.clone(),
        status: PostStatus::Published,
    };
    match publish_helpers::save_post(&pool, &classifier, user.user_id, Some(existing.id), &input)
        .await
    {
        Ok(post) => HttpResponse::Ok().json(post),
        Err(e) => publish_error_response(e),
    }
}

async fn list_revisions(
    user: AuthenticatedUser,
    post_id: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> impl Responder {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match owned_post_id(&conn, *post_id, &user) {
        Ok(id) => match posts_db_operations::read_revisions(&conn, id) {
            Ok(revisions) => HttpResponse::Ok().json(revisions),
            Err(e) => {
                log::error!("Failed to list revisions for post {}: {}", id, e);
                HttpResponse::InternalServerError().finish()
            }
        },
        Err(response) => response,
    }
}

async fn delete_post_action(
    user: AuthenticatedUser,
    post_id: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> impl Responder {
    let mut conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    let id = match owned_post_id(&conn, *post_id, &user) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match posts_db_operations::delete_post_cascade(&mut conn, id) {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "success" })),
        Err(e) => {
            log::error!("Failed to delete post {}: {}", id, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Resolves a post id to one the caller owns, or the HTTP error to return.
fn owned_post_id(
    conn: &rusqlite::Connection,
    post_id: i64,
    user: &AuthenticatedUser,
) -> Result<i64, HttpResponse> {
    match posts_db_operations::read_post_by_id(conn, post_id) {
        Ok(Some(post)) if post.author_id == user.user_id => Ok(post.id),
        Ok(_) => Err(HttpResponse::NotFound().json(json!({
            "status": "error",
            "message": "Post not found."
        }))),
        Err(e) => {
            log::error!("Failed to read post {}: {}", post_id, e);
            Err(HttpResponse::InternalServerError().finish())
        }
    }
}

#[derive(Deserialize)]
struct CreateQuizRequest {
    post_id: i64,
    questions: serde_json::Value,
}

async fn create_quiz_action(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    payload: web::Json<CreateQuizRequest>,
) -> impl Responder {
    let is_empty = payload
        .questions
        .as_array()
        .map_or(true, |a| a.is_empty());
    if is_empty {
        return HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": "Questions must be a non-empty array."
        }));
    }

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    let post_id = match owned_post_id(&conn, payload.post_id, &user) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match widgets_db_operations::create_quiz(&conn, post_id, &payload.questions) {
        Ok(quiz_id) => HttpResponse::Ok().json(json!({
            "status": "success",
            "quiz_id": quiz_id,
            "shortcode": WidgetKind::Quiz.shortcode(quiz_id)
        })),
        Err(e) => {
            log::error!("Failed to create quiz for post {}: {}", post_id, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Deserialize)]
struct CreateChartRequest {
    post_id: i64,
    chart_type: String,
    data: serde_json::Value,
}

async fn create_chart_action(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    payload: web::Json<CreateChartRequest>,
) -> impl Responder {
    if payload.chart_type.trim().is_empty() || payload.data.is_null() {
        return HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": "Chart type and data are required."
        }));
    }

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    let post_id = match owned_post_id(&conn, payload.post_id, &user) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match widgets_db_operations::create_chart(&conn, post_id, &payload.chart_type, &payload.data) {
        Ok(chart_id) => HttpResponse::Ok().json(json!({
            "status": "success",
            "chart_id": chart_id,
            "shortcode": WidgetKind::Chart.shortcode(chart_id)
        })),
        Err(e) => {
            log::error!("Failed to create chart for post {}: {}", post_id, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Deserialize)]
struct CreateVideoRequest {
    post_id: i64,
    url: String,
    filename: Option<String>,
}

/// Registers video metadata; moving the bytes is the upload layer's job.
async fn create_video_action(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    payload: web::Json<CreateVideoRequest>,
) -> impl Responder {
    if payload.url.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": "Video URL is required."
        }));
    }

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    let post_id = match owned_post_id(&conn, payload.post_id, &user) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match widgets_db_operations::create_video(
        &conn,
        post_id,
        &payload.url,
        payload.filename.as_deref(),
        Utc::now(),
    ) {
        Ok(video_id) => HttpResponse::Ok().json(json!({
            "status": "success",
            "video_id": video_id,
            "shortcode": WidgetKind::Video.shortcode(video_id)
        })),
        Err(e) => {
            log::error!("Failed to create video for post {}: {}", post_id, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn dashboard_summary_action(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> impl Responder {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match analytics_helpers::dashboard_summary(&conn, user.user_id) {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => {
            log::error!("Failed to build dashboard summary: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn dashboard_analytics_action(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> impl Responder {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match analytics_helpers::dashboard_analytics(&conn, user.user_id) {
        Ok(analytics) => HttpResponse::Ok().json(analytics),
        Err(e) => {
            log::error!("Failed to build dashboard analytics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

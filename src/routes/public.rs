use crate::helper::shortcode_helpers;
use crate::middleware::client_ip;
use crate::models::db_operations::{
    analytics_db_operations, posts_db_operations, widgets_db_operations,
};
use crate::models::EventKind;
use crate::DbPool;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct PageQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/posts/latest", web::get().to(get_latest_posts))
            .route("/posts/category/{category}", web::get().to(get_posts_by_category))
            .route("/posts/tag/{tag}", web::get().to(get_posts_by_tag))
            .route("/posts/{slug}", web::get().to(get_post_by_slug))
            .route("/quiz/{id}", web::get().to(get_quiz))
            .route("/quiz/{id}/log", web::post().to(log_quiz_event))
            .route("/chart/{id}", web::get().to(get_chart))
            .route("/video/{id}", web::get().to(get_video)),
    );
}

async fn get_latest_posts(pool: web::Data<DbPool>, query: web::Query<PageQuery>) -> impl Responder {
    let limit = query.limit.unwrap_or(10);
    let offset = query.offset.unwrap_or(0);

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match posts_db_operations::read_published_posts(&conn, limit, offset) {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => {
            log::error!("Failed to fetch latest posts: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn get_posts_by_category(
    category: web::Path<String>,
    pool: web::Data<DbPool>,
    query: web::Query<PageQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(10);
    let offset = query.offset.unwrap_or(0);
    let category = category.into_inner();

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match posts_db_operations::read_published_posts_by_category(&conn, &category, limit, offset) {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => {
            log::error!("Failed to fetch posts for category '{}': {}", category, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn get_posts_by_tag(
    tag: web::Path<String>,
    pool: web::Data<DbPool>,
    query: web::Query<PageQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(10);
    let offset = query.offset.unwrap_or(0);
    let tag = tag.into_inner();

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match posts_db_operations::read_published_posts_by_tag(&conn, &tag, limit, offset) {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => {
            log::error!("Failed to fetch posts for tag '{}': {}", tag, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Single published post, served with its shortcodes expanded into widget
/// placeholders. Each hit bumps the view counter and appends a view event.
async fn get_post_by_slug(
    req: HttpRequest,
    slug: web::Path<String>,
    pool: web::Data<DbPool>,
) -> impl Responder {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };

    let mut post = match posts_db_operations::read_published_post_by_slug(&conn, &slug) {
        Ok(Some(post)) => post,
        Ok(None) => return HttpResponse::NotFound().body("Post not found"),
        Err(e) => {
            log::error!("Failed to fetch post '{}': {}", slug, e);
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = posts_db_operations::increment_views(&conn, post.id) {
        log::warn!("Failed to increment views for post {}: {}", post.id, e);
    }
    if let Err(e) = analytics_db_operations::append_event(
        &conn,
        post.id,
        EventKind::View,
        &client_ip(&req),
        Utc::now(),
    ) {
        log::warn!("Failed to log view event for post {}: {}", post.id, e);
    }

    post.views += 1;
    post.content = shortcode_helpers::expand_shortcodes(&post.content);
    HttpResponse::Ok().json(post)
}

async fn get_quiz(quiz_id: web::Path<i64>, pool: web::Data<DbPool>) -> impl Responder {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match widgets_db_operations::read_quiz(&conn, *quiz_id) {
        Ok(Some(quiz)) => HttpResponse::Ok().json(quiz),
        Ok(None) => HttpResponse::NotFound().body("Quiz not found"),
        Err(e) => {
            log::error!("Failed to fetch quiz {}: {}", quiz_id, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Deserialize)]
struct QuizEventRequest {
    event_type: String,
}

/// Reader interaction with a quiz: bumps the monotonic counter and appends
/// the matching analytics event against the owning post.
async fn log_quiz_event(
    req: HttpRequest,
    quiz_id: web::Path<i64>,
    pool: web::Data<DbPool>,
    payload: web::Json<QuizEventRequest>,
) -> impl Responder {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };

    let quiz = match widgets_db_operations::read_quiz(&conn, *quiz_id) {
        Ok(Some(quiz)) => quiz,
        Ok(None) => return HttpResponse::NotFound().body("Quiz not found"),
        Err(e) => {
            log::error!("Failed to fetch quiz {}: {}", quiz_id, e);
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (update_result, event) = match payload.event_type.as_str() {
        "attempt" => (
            widgets_db_operations::increment_quiz_attempts(&conn, quiz.id),
            EventKind::QuizAttempt,
        ),
        "success" => (
            widgets_db_operations::increment_quiz_successes(&conn, quiz.id),
            EventKind::QuizSuccess,
        ),
        other => {
            return HttpResponse::BadRequest().json(json!({
                "status": "error",
                "message": format!("Unknown event type '{}'.", other)
            }))
        }
    };
    if let Err(e) = update_result {
        log::error!("Failed to update counters for quiz {}: {}", quiz.id, e);
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = analytics_db_operations::append_event(
        &conn,
        quiz.post_id,
        event,
        &client_ip(&req),
        Utc::now(),
    ) {
        log::warn!("Failed to log quiz event for quiz {}: {}", quiz.id, e);
    }

    HttpResponse::Ok().json(json!({ "status": "success" }))
}

async fn get_chart(chart_id: web::Path<i64>, pool: web::Data<DbPool>) -> impl Responder {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match widgets_db_operations::read_chart(&conn, *chart_id) {
        Ok(Some(chart)) => HttpResponse::Ok().json(chart.data),
        Ok(None) => HttpResponse::NotFound().body("Chart not found"),
        Err(e) => {
            log::error!("Failed to fetch chart {}: {}", chart_id, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn get_video(video_id: web::Path<i64>, pool: web::Data<DbPool>) -> impl Responder {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match widgets_db_operations::read_video(&conn, *video_id) {
        Ok(Some(video)) => HttpResponse::Ok().json(video),
        Ok(None) => HttpResponse::NotFound().body("Video not found"),
        Err(e) => {
            log::error!("Failed to fetch video {}: {}", video_id, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{analytics_db_operations, users_db_operations};
use crate::DbPool;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

pub fn config_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .route("/users", web::get().to(list_users))
            .route("/users", web::post().to(create_user_action))
            .route("/users/{id}", web::delete().to(delete_user_action))
            .route("/logins", web::get().to(list_login_events))
            .route("/blocked_ips", web::get().to(list_blocked_ips))
            .route("/blocked_ips/{ip}", web::delete().to(unblock_ip_action)),
    );
}

fn forbidden() -> HttpResponse {
    HttpResponse::Forbidden().json(json!({
        "status": "error",
        "message": "Admin privileges required."
    }))
}

async fn list_users(user: AuthenticatedUser, pool: web::Data<DbPool>) -> impl Responder {
    if !user.is_admin() {
        return forbidden();
    }
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match users_db_operations::read_all_users(&conn) {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(e) => {
            log::error!("Failed to list users: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    password: String,
    role: String,
}

async fn create_user_action(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    payload: web::Json<CreateUserRequest>,
) -> impl Responder {
    if !user.is_admin() {
        return forbidden();
    }
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": "Username and password are required."
        }));
    }
    if !matches!(payload.role.as_str(), "admin" | "author") {
        return HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": "Role must be 'admin' or 'author'."
        }));
    }

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match users_db_operations::create_user(&conn, username, &payload.password, &payload.role) {
        Ok(user_id) => HttpResponse::Ok().json(json!({
            "status": "success",
            "user_id": user_id
        })),
        Err(e) => {
            log::error!("Failed to create user '{}': {}", username, e);
            HttpResponse::Conflict().json(json!({
                "status": "error",
                "message": "Could not create user (username may be taken)."
            }))
        }
    }
}

async fn delete_user_action(
    user: AuthenticatedUser,
    user_id: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> impl Responder {
    if !user.is_admin() {
        return forbidden();
    }
    if *user_id == user.user_id {
        return HttpResponse::BadRequest().json(json!({
            "status": "error",
            "message": "You cannot delete your own account."
        }));
    }

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match users_db_operations::delete_user(&conn, *user_id) {
        Ok(0) => HttpResponse::NotFound().json(json!({
            "status": "error",
            "message": "User not found."
        })),
        Ok(_) => HttpResponse::Ok().json(json!({ "status": "success" })),
        Err(e) => {
            log::error!("Failed to delete user {}: {}", user_id, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Deserialize)]
pub struct LoginLogQuery {
    limit: Option<u32>,
}

/// Recent login audit trail (successes and failures, newest first).
async fn list_login_events(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    query: web::Query<LoginLogQuery>,
) -> impl Responder {
    if !user.is_admin() {
        return forbidden();
    }
    let limit = query.limit.unwrap_or(100);

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match analytics_db_operations::read_login_events(&conn, limit) {
        Ok(events) => HttpResponse::Ok().json(events),
        Err(e) => {
            log::error!("Failed to list login events: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn list_blocked_ips(user: AuthenticatedUser, pool: web::Data<DbPool>) -> impl Responder {
    if !user.is_admin() {
        return forbidden();
    }
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match users_db_operations::read_blocked_ips(&conn) {
        Ok(blocked) => HttpResponse::Ok().json(blocked),
        Err(e) => {
            log::error!("Failed to list blocked IPs: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// The only unblock path: explicit administrative removal.
async fn unblock_ip_action(
    user: AuthenticatedUser,
    ip: web::Path<String>,
    pool: web::Data<DbPool>,
) -> impl Responder {
    if !user.is_admin() {
        return forbidden();
    }
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };
    match users_db_operations::unblock_ip(&conn, &ip) {
        Ok(0) => HttpResponse::NotFound().json(json!({
            "status": "error",
            "message": "Address is not blocked."
        })),
        Ok(_) => {
            log::info!("Administrator {} unblocked address {}.", user.username, ip);
            HttpResponse::Ok().json(json!({ "status": "success" }))
        }
        Err(e) => {
            log::error!("Failed to unblock address {}: {}", ip, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

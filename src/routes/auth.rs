use crate::helper::sanitization_helpers;
use crate::helper::throttle_helpers::{self, LoginOutcome};
use crate::middleware::client_ip;
use crate::DbPool;
use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

pub fn config_auth(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/login", web::post().to(handle_login))
            .route("/logout", web::post().to(handle_logout)),
    );
}

async fn handle_login(
    req: HttpRequest,
    session: Session,
    pool: web::Data<DbPool>,
    payload: web::Json<LoginRequest>,
) -> impl Responder {
    let ip = client_ip(&req);
    let username = sanitization_helpers::strip_all_html(payload.username.trim());

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to get DB connection for login: {}", e);
            return HttpResponse::InternalServerError().finish();
        }
    };

    let outcome =
        match throttle_helpers::handle_login_attempt(&conn, &username, &payload.password, &ip) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Login attempt failed with a storage error: {}", e);
                return HttpResponse::InternalServerError().finish();
            }
        };

    match outcome {
        LoginOutcome::BlockedOrigin => HttpResponse::Forbidden().json(json!({
            "status": "error",
            "message": "Your IP address has been blocked due to multiple failed login attempts."
        })),
        LoginOutcome::Success {
            user_id,
            username,
            role,
        } => {
            let inserted = session
                .insert("user_id", user_id)
                .and_then(|_| session.insert("username", &username))
                .and_then(|_| session.insert("role", &role));
            if let Err(e) = inserted {
                log::error!("Failed to establish session after login: {}", e);
                return HttpResponse::InternalServerError().finish();
            }
            HttpResponse::Ok().json(json!({
                "status": "success",
                "username": username,
                "role": role
            }))
        }
        LoginOutcome::InvalidCredentials => HttpResponse::Unauthorized().json(json!({
            "status": "error",
            "message": "Invalid username or password."
        })),
        LoginOutcome::LockedOut => HttpResponse::Forbidden().json(json!({
            "status": "error",
            "message": "Account locked due to multiple failed attempts. Contact admin."
        })),
    }
}

async fn handle_logout(session: Session) -> impl Responder {
    session.purge();
    HttpResponse::Ok().json(json!({ "status": "success" }))
}

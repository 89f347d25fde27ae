/// HTTP handlers and route table
///
/// - Classification: `POST /api/classify/`
/// - Disposal chat: `POST /api/disposal-chat/`
/// - Accounts: `POST /api/users/register/`, `POST /api/users/login/`
/// - Posts: CRUD under `/api/posts/`, token authenticated for writes
pub mod chat;
pub mod classify;
pub mod health;
pub mod posts;
pub mod users;

use crate::error::{AppError, Result};
use crate::metrics::serve_metrics;
use crate::middleware::TokenAuth;
use actix_web::{web, HttpRequest, HttpResponse};

/// 405 for resources that follow the generic `Method "X" not allowed.` wording
pub async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse> {
    Err(AppError::method_not_allowed(req.method().as_str()))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("JSON parse error - {}", err)).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err, _req| AppError::not_found().into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Register every route on `cfg`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .app_data(query_config())
        .route("/health", web::get().to(health::liveness))
        .route("/ready", web::get().to(health::readiness))
        .route("/metrics", web::get().to(serve_metrics))
        .service(
            web::resource("/api/classify/")
                .route(web::post().to(classify::classify))
                .default_service(web::to(classify::method_not_allowed)),
        )
        .service(
            web::resource("/api/disposal-chat/")
                .route(web::post().to(chat::disposal_chat))
                .default_service(web::to(chat::method_not_allowed)),
        )
        .service(
            web::scope("/api/users")
                .service(
                    web::resource("/register/")
                        .route(web::post().to(users::register))
                        .default_service(web::to(method_not_allowed)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::post().to(users::login))
                        .default_service(web::to(method_not_allowed)),
                ),
        )
        .service(
            web::scope("/api/posts")
                .wrap(TokenAuth)
                .service(
                    web::resource("/")
                        .route(web::get().to(posts::list_posts))
                        .route(web::post().to(posts::create_post))
                        .default_service(web::to(method_not_allowed)),
                )
                .service(
                    web::resource("/{id}/")
                        .route(web::get().to(posts::get_post))
                        .route(web::put().to(posts::replace_post))
                        .route(web::patch().to(posts::patch_post))
                        .route(web::delete().to(posts::delete_post))
                        .default_service(web::to(method_not_allowed)),
                ),
        );
}

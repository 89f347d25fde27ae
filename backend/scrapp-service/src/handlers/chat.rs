/// Disposal chat endpoint
use crate::error::{AppError, Result};
use crate::metrics::CHAT_REQUESTS_TOTAL;
use crate::services::chat::DisposalChatRequest;
use crate::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// POST /api/disposal-chat/
pub async fn disposal_chat(body: web::Bytes, state: web::Data<AppState>) -> Result<HttpResponse> {
    let request: DisposalChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected chat body");
            CHAT_REQUESTS_TOTAL.with_label_values(&["bad_request"]).inc();
            return Err(AppError::BadRequest("Invalid JSON body.".to_string()));
        }
    };

    match state.chat.reply(request, Utc::now()).await {
        Ok(reply) => {
            CHAT_REQUESTS_TOTAL.with_label_values(&["ok"]).inc();
            Ok(HttpResponse::Ok().json(ChatReply { reply }))
        }
        Err(e) => {
            let outcome = match e {
                AppError::Upstream(_) => "upstream_error",
                _ => "bad_request",
            };
            CHAT_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
            Err(e)
        }
    }
}

pub async fn method_not_allowed() -> Result<HttpResponse> {
    Err(AppError::MethodNotAllowed(
        "POST JSON: {message, label?, instructions?, history?}.".to_string(),
    ))
}

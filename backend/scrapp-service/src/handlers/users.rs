/// Account endpoints
use crate::error::Result;
use crate::services::accounts::{LoginRequest, RegisterRequest};
use crate::AppState;
use actix_web::{web, HttpResponse};

/// POST /api/users/register/
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let created = state.accounts.register(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// POST /api/users/login/
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let token = state.accounts.login(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(token))
}

use crate::error::AppError;
use crate::models::User;
use crate::security::token::parse_authorization;
use crate::AppState;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Account resolved from a valid `Authorization: Token <key>` header
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Token authentication middleware
///
/// Requests without credentials pass through anonymously; handlers that need
/// a user take [`CurrentUser`]. A key that matches no account is rejected here.
pub struct TokenAuth;

impl<S, B> Transform<S, ServiceRequest> for TokenAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = TokenAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TokenAuthService {
            service: Rc::new(service),
        }))
    }
}

pub struct TokenAuthService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for TokenAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let key = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .and_then(parse_authorization)
                .map(str::to_string);

            if let Some(key) = key {
                let state = match req.app_data::<web::Data<AppState>>().cloned() {
                    Some(state) => state,
                    None => {
                        let err = AppError::Internal("application state missing".into());
                        return Ok(req.error_response(err).map_into_right_body());
                    }
                };

                match state.accounts.authenticate(&key).await {
                    Ok(Some(user)) => {
                        req.extensions_mut().insert(CurrentUser(user));
                    }
                    Ok(None) => {
                        tracing::warn!("Rejected unknown API token");
                        let err = AppError::Unauthorized("Invalid token.".into());
                        return Ok(req.error_response(err).map_into_right_body());
                    }
                    Err(err) => return Ok(req.error_response(err).map_into_right_body()),
                }
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}

impl actix_web::FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<CurrentUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AppError::Unauthorized(
                "Authentication credentials were not provided.".into(),
            )
            .into())),
        }
    }
}

use crate::error::AppError;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Rejects requests whose `Host` is not in the configured list.
///
/// Entries match exactly (case-insensitive, port ignored); a leading dot
/// matches the domain and all subdomains; `*` matches everything.
#[derive(Clone)]
pub struct AllowedHosts {
    hosts: Rc<Vec<String>>,
}

impl AllowedHosts {
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            hosts: Rc::new(hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect()),
        }
    }
}

/// Strip the port, keeping bracketed IPv6 literals intact
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

pub fn host_allowed(host: &str, allowed: &[String]) -> bool {
    let host = strip_port(host).trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return false;
    }

    allowed.iter().any(|pattern| {
        if pattern == "*" {
            true
        } else if let Some(domain) = pattern.strip_prefix('.') {
            host == domain || host.ends_with(pattern.as_str())
        } else {
            host == *pattern
        }
    })
}

impl<S, B> Transform<S, ServiceRequest> for AllowedHosts
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AllowedHostsService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AllowedHostsService {
            service: Rc::new(service),
            hosts: self.hosts.clone(),
        }))
    }
}

pub struct AllowedHostsService<S> {
    service: Rc<S>,
    hosts: Rc<Vec<String>>,
}

impl<S, B> Service<ServiceRequest> for AllowedHostsService<S>
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
        let host = req.connection_info().host().to_string();

        if !host_allowed(&host, &self.hosts) {
            tracing::warn!(host = %host, "Rejected request with disallowed Host header");
            let res = req.error_response(AppError::BadRequest("Invalid host header".into()));
            return Box::pin(async move { Ok(res.map_into_right_body()) });
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

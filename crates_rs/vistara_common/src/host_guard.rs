use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

#[derive(Clone)]
pub struct AllowedHostsLayer {
    allowed: Vec<String>,
}

impl AllowedHostsLayer {
    pub fn new(allowed_hosts: Vec<String>) -> Self {
        let allowed = allowed_hosts
            .into_iter()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self { allowed }
    }
}

impl<S> Layer<S> for AllowedHostsLayer {
    type Service = AllowedHostsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AllowedHostsService {
            inner,
            allowed: self.allowed.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AllowedHostsService<S> {
    inner: S,
    allowed: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

/// Strips the port and any IPv6 brackets from a Host header value.
fn normalize_host(raw: &str) -> String {
    let h = raw.trim();
    let h = if let Some(stripped) = h.strip_prefix('[') {
        stripped.split(']').next().unwrap_or("")
    } else {
        h.split(':').next().unwrap_or("")
    };
    h.trim().to_lowercase()
}

fn host_allowed(allowed: &[String], host: &str) -> bool {
    allowed.iter().any(|rule| match rule.as_str() {
        "*" => true,
        // ".example.com" matches both "example.com" and any subdomain.
        r if r.starts_with('.') => host == &r[1..] || host.ends_with(rule.as_str()),
        r => host == r,
    })
}

impl<S, B> Service<Request<B>> for AllowedHostsService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let allowed = self.allowed.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if allowed.is_empty() {
                return inner.call(req).await;
            }

            let host = req
                .headers()
                .get("host")
                .and_then(|v| v.to_str().ok())
                .map(normalize_host)
                .unwrap_or_default();

            if host.is_empty() || !host_allowed(&allowed, &host) {
                let body = axum::Json(ErrorBody {
                    detail: "invalid host",
                });
                return Ok((StatusCode::BAD_REQUEST, body).into_response());
            }

            inner.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_normalization_works() {
        assert_eq!(normalize_host("Api.Vistara.app:8084"), "api.vistara.app");
        assert_eq!(normalize_host("[::1]:8084"), "::1");
        assert_eq!(normalize_host("localhost"), "localhost");
    }

    #[test]
    fn dot_rules_match_domain_and_subdomains() {
        let allowed = vec![".vistara.app".to_string()];
        assert!(host_allowed(&allowed, "vistara.app"));
        assert!(host_allowed(&allowed, "api.vistara.app"));
        assert!(!host_allowed(&allowed, "evil-vistara.app"));
    }

    #[test]
    fn wildcard_allows_everything() {
        let allowed = vec!["*".to_string()];
        assert!(host_allowed(&allowed, "anything.example"));
    }
}

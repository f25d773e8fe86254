//! Request routing and response encoding

use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

use gtfo_core::error::{ApiError, TokenResponse};
use gtfo_core::platform::HttpClient;
use gtfo_core::sts::{self, TokenService};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

pub type HyperResponse = Response<Full<Bytes>>;

/// Shared application state
pub struct AppState {
    pub service: TokenService,
    pub http: Arc<dyn HttpClient>,
    request_id: AtomicU64,
}

impl AppState {
    pub fn new(service: TokenService, http: Arc<dyn HttpClient>) -> Self {
        Self {
            service,
            http,
            request_id: AtomicU64::new(0),
        }
    }
}

pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<HyperResponse, std::convert::Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let id = state.request_id.fetch_add(1, Ordering::Relaxed) + 1;
    let span = tracing::info_span!("request", id, method = %req.method(), path = %req.uri().path());
    let response = route_request(req, &state).instrument(span).await;
    Ok(response)
}

async fn route_request<B>(req: Request<B>, state: &AppState) -> HyperResponse
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    debug!("received request");
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::GET, "/") | (Method::GET, "/healthz") => handle_health(),
        (Method::POST, "/") | (Method::POST, "/token") => handle_exchange(req, state).await,
        (Method::POST, "/revoke") => handle_revoke(req, state).await,
        _ => json_response(StatusCode::NOT_FOUND, &serde_json::json!({"error": "not_found"})),
    }
}

fn handle_health() -> HyperResponse {
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "name": "gtfo",
            "status": "ok",
        }),
    )
}

async fn handle_exchange<B>(req: Request<B>, state: &AppState) -> HyperResponse
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bearer_token = match extract_bearer_token(req.headers()) {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };

    let body = match read_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state.service.exchange(&bearer_token, &body).await {
        Ok(issued) => {
            info!(expires_at = %issued.expires_at, "token issued");
            json_response(StatusCode::OK, &TokenResponse::issued(issued.token))
        }
        Err(e) => error_response(&e),
    }
}

async fn handle_revoke<B>(req: Request<B>, state: &AppState) -> HyperResponse {
    let bearer_token = match extract_bearer_token(req.headers()) {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };

    match sts::revoke::revoke(&bearer_token, state.http.as_ref()).await {
        Ok(()) => {
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::NO_CONTENT;
            response
        }
        Err(e) => error_response(&e),
    }
}

async fn read_body<B>(body: B) -> Result<Bytes, ApiError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| ApiError::invalid_request(format!("failed to read body: {}", e)))
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get(hyper::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::malformed_token("missing Authorization header"))?
        .to_str()
        .map_err(|_| ApiError::malformed_token("invalid Authorization header encoding"))?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(ApiError::malformed_token(
            "Authorization header must use Bearer scheme",
        )),
    }
}

fn error_response(err: &ApiError) -> HyperResponse {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %err, kind = err.error_key(), "request failed");
    } else {
        warn!(error = %err, kind = err.error_key(), "request rejected");
    }
    json_response(status, &TokenResponse::from(err))
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> HyperResponse {
    let json = serde_json::to_vec(body).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gtfo_core::config::RegoConfig;
    use gtfo_core::error::Result;
    use gtfo_core::github::Clients;
    use gtfo_core::oidc::new_verifier;
    use gtfo_core::platform::{Clock, HttpResponse};
    use gtfo_core::policy::AuthorizationEngine;
    use gtfo_core::sts::Issuer;
    use std::collections::HashMap;

    /// Answers every outbound request with 404
    struct NotFoundHttp;

    #[async_trait]
    impl HttpClient for NotFoundHttp {
        async fn get(&self, _url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse> {
            Ok(HttpResponse { status: 404, body: Vec::new() })
        }

        async fn post(&self, _url: &str, _headers: &[(&str, &str)], _body: &[u8]) -> Result<HttpResponse> {
            Ok(HttpResponse { status: 404, body: Vec::new() })
        }

        async fn delete(&self, _url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse> {
            Ok(HttpResponse { status: 401, body: Vec::new() })
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_secs(&self) -> u64 {
            1706900000
        }
    }

    fn state() -> Arc<AppState> {
        let http: Arc<dyn HttpClient> = Arc::new(NotFoundHttp);
        let clock: Arc<dyn Clock> = Arc::new(FixedClock);
        let clients = Arc::new(Clients::new(HashMap::new(), http.clone(), clock.clone()));
        let verifier = new_verifier(
            &["https://token.actions.githubusercontent.com".to_string()],
            None,
            http.clone(),
            clock,
        )
        .unwrap();
        let engine = AuthorizationEngine::new(clients.clone(), RegoConfig::default());
        let service = TokenService::new(verifier, engine, Issuer::new(clients));
        Arc::new(AppState::new(service, http))
    }

    fn request(method: Method, path: &str, auth: Option<&str>, body: &str) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Full::new(Bytes::from(body.to_string()))).unwrap()
    }

    async fn body_json(response: HyperResponse) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = handle_request(request(Method::GET, "/healthz", None, ""), state())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = handle_request(request(Method::GET, "/nope", None, ""), state())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_exchange_without_bearer_is_unauthorized() {
        let response = handle_request(request(Method::POST, "/", None, "{}"), state())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["token"], "");
        assert_eq!(body["revocable"], true);
        assert!(body["error"].as_str().unwrap().contains("Authorization"));
    }

    #[tokio::test]
    async fn test_exchange_with_malformed_token() {
        let response = handle_request(
            request(Method::POST, "/token", Some("Bearer not-a-jwt"), "{}"),
            state(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_revoke_rejected_token() {
        let response = handle_request(
            request(Method::POST, "/revoke", Some("Bearer ghs_old"), ""),
            state(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("Authorization", "Basic abc".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("Authorization", "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_error_response_hides_internal_detail() {
        let response = error_response(&ApiError::issuance_failed("GitHub said: secret"));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}

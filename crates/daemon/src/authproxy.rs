// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reverse HTTP proxy that lets a sandboxed agent authenticate to a
//! provider API without ever holding the real credential: the agent is
//! handed a placeholder (`AuthProxy::build_stub`) that encodes its session
//! id, and every request carrying it is rewritten with the real credential
//! before being forwarded upstream. Grounded on the env-var/file fallback
//! chain in `warden-adapters::credential_adapter` for credential lookup and
//! on the buffered upstream-client shape of a non-teacher reverse-proxy
//! example for the request-forwarding path, generalized here to stream both
//! directions instead of buffering a fixed JSON body.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures_util::TryStreamExt;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use warden_core::clock::Clock;
use warden_core::credential::CredentialEntry;
use warden_core::session::SessionId;
use warden_storage::CredentialStore;

#[derive(Debug, Error)]
pub enum AuthProxyError {
    #[error("no route matches this path")]
    UnknownRoute,
    #[error("missing or malformed session placeholder")]
    MissingSession,
    #[error("session not registered for this provider")]
    Unauthorized,
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl IntoResponse for AuthProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthProxyError::UnknownRoute => StatusCode::NOT_FOUND,
            AuthProxyError::MissingSession => StatusCode::UNAUTHORIZED,
            AuthProxyError::Unauthorized => StatusCode::FORBIDDEN,
            AuthProxyError::CredentialUnavailable(_) | AuthProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}

/// A statically enumerated provider: URL prefix, the key its credential is
/// stored under, the upstream base it forwards to, and the three
/// per-provider functions the routing algorithm needs. A closed set, so
/// plain function pointers beat a trait object here.
pub struct ProviderRoute {
    pub name: &'static str,
    pub prefix: &'static str,
    pub credential_key: &'static str,
    pub upstream_base: &'static str,
    pub extract_session_id: fn(&HeaderMap) -> Option<String>,
    pub inject_auth: fn(&mut HeaderMap, &CredentialEntry),
    pub build_stub: fn(&str) -> serde_json::Value,
}

fn anthropic_extract(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    token.strip_prefix("sk-ant-oat01-proxy-").map(str::to_string)
}

fn anthropic_inject(headers: &mut HeaderMap, credential: &CredentialEntry) {
    set_bearer(headers, credential.bearer_value());
    headers.insert("anthropic-beta", HeaderValue::from_static("oauth-2025-04-20"));
}

fn anthropic_stub(session_id: &str) -> serde_json::Value {
    serde_json::json!({ "type": "api_key", "key": format!("sk-ant-oat01-proxy-{session_id}") })
}

fn codex_extract(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let jwt = value.strip_prefix("Bearer ")?;
    let mut parts = jwt.split('.');
    let _header = parts.next()?;
    let payload_b64 = parts.next()?;
    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).ok()?;
    payload.get("oppi_session").and_then(|v| v.as_str()).map(str::to_string)
}

fn codex_inject(headers: &mut HeaderMap, credential: &CredentialEntry) {
    set_bearer(headers, credential.bearer_value());
}

fn codex_stub(session_id: &str) -> serde_json::Value {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = serde_json::json!({
        "https://api.openai.com/auth": { "chatgpt_account_id": "proxy" },
        "oppi_session": session_id,
    });
    let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
    serde_json::json!({ "type": "api_key", "key": format!("{header}.{payload}.") })
}

fn set_bearer(headers: &mut HeaderMap, token: &str) {
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(axum::http::header::AUTHORIZATION, value);
    }
}

fn default_routes() -> Vec<ProviderRoute> {
    vec![
        ProviderRoute {
            name: "anthropic",
            prefix: "/proxy/anthropic",
            credential_key: "anthropic",
            upstream_base: "https://api.anthropic.com",
            extract_session_id: anthropic_extract,
            inject_auth: anthropic_inject,
            build_stub: anthropic_stub,
        },
        ProviderRoute {
            name: "openai-codex",
            prefix: "/proxy/openai-codex",
            credential_key: "openai-codex",
            upstream_base: "https://chatgpt.com/backend-api/codex",
            extract_session_id: codex_extract,
            inject_auth: codex_inject,
            build_stub: codex_stub,
        },
    ]
}

/// Headers that must never be copied verbatim between the inbound
/// connection and the upstream one.
const HOP_BY_HOP: &[&str] = &["host", "connection", "transfer-encoding", "keep-alive", "upgrade"];

pub struct AuthProxy {
    routes: Vec<ProviderRoute>,
    credentials: Arc<CredentialStore<warden_core::clock::SystemClock>>,
    sessions: Mutex<HashMap<SessionId, HashSet<&'static str>>>,
    client: reqwest::Client,
}

impl AuthProxy {
    pub fn new(credentials: Arc<CredentialStore<warden_core::clock::SystemClock>>) -> Self {
        let client = reqwest::Client::builder().build().unwrap_or_default();
        Self { routes: default_routes(), credentials, sessions: Mutex::new(HashMap::new()), client }
    }

    /// Authorize `session_id` to proxy through `providers` (all known
    /// providers when empty).
    pub fn register_session(&self, session_id: SessionId, providers: &[String]) {
        let names: HashSet<&'static str> = if providers.is_empty() {
            self.routes.iter().map(|r| r.name).collect()
        } else {
            self.routes.iter().filter(|r| providers.iter().any(|p| p == r.name)).map(|r| r.name).collect()
        };
        self.sessions.lock().insert(session_id, names);
    }

    pub fn remove_session(&self, session_id: &SessionId) {
        self.sessions.lock().remove(session_id);
    }

    /// The placeholder credential a session should write into its own
    /// filesystem view so its agent SDK calls back through this proxy.
    pub fn build_stub(&self, provider: &str, session_id: &SessionId) -> Option<serde_json::Value> {
        let route = self.routes.iter().find(|r| r.name == provider)?;
        Some((route.build_stub)(session_id.as_str()))
    }

    fn route_for(&self, path: &str) -> Option<&ProviderRoute> {
        self.routes.iter().find(|r| path.starts_with(r.prefix))
    }

    fn is_authorized(&self, session_id: &SessionId, provider: &'static str) -> bool {
        self.sessions.lock().get(session_id).is_some_and(|providers| providers.contains(provider))
    }

    /// Number of sessions currently registered to proxy through this
    /// instance, for the `/health` endpoint.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

pub fn router(auth_proxy: Arc<AuthProxy>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_handler))
        .fallback(any(proxy_handler))
        .with_state(auth_proxy)
}

async fn health_handler(State(auth_proxy): State<Arc<AuthProxy>>) -> Response {
    axum::Json(serde_json::json!({ "ok": true, "sessions": auth_proxy.session_count() })).into_response()
}

async fn proxy_handler(State(auth_proxy): State<Arc<AuthProxy>>, req: Request) -> Response {
    match handle_request(&auth_proxy, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handle_request(auth_proxy: &AuthProxy, req: Request) -> Result<Response, AuthProxyError> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path();

    let route = auth_proxy.route_for(path).ok_or(AuthProxyError::UnknownRoute)?;

    let session_id_str = (route.extract_session_id)(&parts.headers).ok_or(AuthProxyError::MissingSession)?;
    let session_id = SessionId::from_string(session_id_str);

    if !auth_proxy.is_authorized(&session_id, route.name) {
        return Err(AuthProxyError::Unauthorized);
    }

    let credential = resolve_credential(auth_proxy, route.credential_key)?;

    let upstream_url = splice_url(route, &parts.uri);

    let mut headers = parts.headers.clone();
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    (route.inject_auth)(&mut headers, &credential);

    let upstream_host = upstream_url.host_str().unwrap_or_default().to_string();
    if let Ok(value) = HeaderValue::from_str(&upstream_host) {
        headers.insert(axum::http::header::HOST, value);
    }

    let body_stream = body.into_data_stream().map_err(std::io::Error::other);
    let upstream_request = auth_proxy
        .client
        .request(parts.method.clone(), upstream_url)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body_stream))
        .build()
        .map_err(|err| AuthProxyError::Upstream(err.to_string()))?;

    let upstream_response =
        auth_proxy.client.execute(upstream_request).await.map_err(|err| AuthProxyError::Upstream(err.to_string()))?;

    let status = upstream_response.status();
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream_response.headers() {
        if HOP_BY_HOP.iter().any(|h| name.as_str().eq_ignore_ascii_case(h)) {
            continue;
        }
        response_headers.insert(HeaderName::from_bytes(name.as_str().as_bytes()).unwrap(), value.clone());
    }

    let response_stream = upstream_response.bytes_stream().map_err(std::io::Error::other);
    let mut response = Response::new(Body::from_stream(response_stream));
    *response.status_mut() = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    *response.headers_mut() = response_headers;
    Ok(response)
}

fn resolve_credential(auth_proxy: &AuthProxy, provider: &str) -> Result<CredentialEntry, AuthProxyError> {
    let credential =
        auth_proxy.credentials.get(provider).map_err(|err| AuthProxyError::CredentialUnavailable(err.to_string()))?;
    let now_ms = warden_core::clock::SystemClock.epoch_ms();
    if credential.is_expired(now_ms) {
        auth_proxy.credentials.invalidate(provider);
        let reloaded =
            auth_proxy.credentials.get(provider).map_err(|err| AuthProxyError::CredentialUnavailable(err.to_string()))?;
        if reloaded.is_expired(now_ms) {
            warn!(provider, "credential still expired after reload");
            return Err(AuthProxyError::CredentialUnavailable("expired".to_string()));
        }
        return Ok(reloaded);
    }
    Ok(credential)
}

fn splice_url(route: &ProviderRoute, uri: &Uri) -> reqwest::Url {
    let suffix = uri.path().strip_prefix(route.prefix).unwrap_or("");
    let mut url = format!("{}{}", route.upstream_base, suffix);
    if let Some(query) = uri.query() {
        url.push('?');
        url.push_str(query);
    }
    url.parse().unwrap_or_else(|_| route.upstream_base.parse().expect("upstream base is a valid URL"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use warden_core::clock::SystemClock;
    use warden_storage::{CredentialResolver, CredentialStoreError};

    struct StaticResolver;
    impl CredentialResolver for StaticResolver {
        fn resolve(&self, provider: &str) -> Result<CredentialEntry, CredentialStoreError> {
            Ok(CredentialEntry::ApiKey { key: format!("real-{provider}-key") })
        }
    }

    fn proxy() -> AuthProxy {
        let credentials = Arc::new(CredentialStore::new(Box::new(StaticResolver), SystemClock));
        AuthProxy::new(credentials)
    }

    #[test]
    fn anthropic_extract_reads_placeholder_session_id() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer sk-ant-REDACTED"),
        );
        assert_eq!(anthropic_extract(&headers), Some("abc12345".to_string()));
    }

    #[test]
    fn codex_extract_reads_oppi_session_from_unsigned_jwt() {
        let stub = codex_stub("abc12345");
        let token = stub["key"].as_str().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(codex_extract(&headers), Some("abc12345".to_string()));
    }

    #[test]
    fn register_session_authorizes_requested_providers_only() {
        let proxy = proxy();
        let session_id = SessionId::new();
        proxy.register_session(session_id.clone(), &["anthropic".to_string()]);
        assert!(proxy.is_authorized(&session_id, "anthropic"));
        assert!(!proxy.is_authorized(&session_id, "openai-codex"));
    }

    #[test]
    fn remove_session_revokes_all_providers() {
        let proxy = proxy();
        let session_id = SessionId::new();
        proxy.register_session(session_id.clone(), &[]);
        proxy.remove_session(&session_id);
        assert!(!proxy.is_authorized(&session_id, "anthropic"));
    }

    #[test]
    fn route_for_matches_by_prefix() {
        let proxy = proxy();
        assert!(proxy.route_for("/proxy/anthropic/v1/messages").is_some());
        assert!(proxy.route_for("/unknown").is_none());
    }

    #[test]
    fn splice_url_preserves_suffix_and_query() {
        let route = &default_routes()[0];
        let uri: Uri = "/proxy/anthropic/v1/messages?beta=true".parse().unwrap();
        let url = splice_url(route, &uri);
        assert_eq!(url.as_str(), "https://api.anthropic.com/v1/messages?beta=true");
    }
}

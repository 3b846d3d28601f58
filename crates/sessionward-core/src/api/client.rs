//! HTTP client for the Auth API.
//!
//! Every request goes through the credential injector on the way out and
//! the failure interceptor on the way back.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{ApiError, AuthApi, CallKind, CredentialInjector, FailureInterceptor};
use crate::config::Config;
use crate::models::{AuthPayload, LoginRequest, RegisterRequest, User};
use crate::session::SessionHandle;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Auth API client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    injector: CredentialInjector,
    interceptor: FailureInterceptor,
}

impl ApiClient {
    /// Create a client for the configured API, bound to `session`
    pub fn new(config: &Config, session: &SessionHandle) -> Result<Self> {
        Self::with_base_url(&config.api_base_url, config.request_timeout(), session)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration, session: &SessionHandle) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            injector: CredentialInjector::new(session.tokens().clone()),
            interceptor: FailureInterceptor::new(session.clone()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send one request, backing off on 429, and return the JSON body.
    /// An empty body reads as `null`.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .header(header::ACCEPT, "application/json")
                .headers(self.injector.auth_headers());
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RATE_LIMIT_RETRIES {
                retries += 1;
                warn!(url, retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let text = response.text().await?;
            if !status.is_success() {
                return Err(ApiError::from_response(status, &text));
            }
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }

            let value: Value = serde_json::from_str(&text)
                .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, url)))?;

            // GraphQL-style gateways report failures inside a 200
            let has_errors = value
                .get("errors")
                .and_then(Value::as_array)
                .is_some_and(|errors| !errors.is_empty());
            if has_errors {
                if let Some(err) = ApiError::from_body(&value) {
                    return Err(err);
                }
            }

            debug!(url, %status, "Response received");
            return Ok(value);
        }
    }

    async fn call<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        kind: CallKind,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let result = self.execute(method, &url, body).await.and_then(|value| {
            serde_json::from_value(value)
                .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, url)))
        });
        self.interceptor.inspect(kind, &url, result)
    }

    async fn ack<B: Serialize + ?Sized>(&self, kind: CallKind, path: &str, body: &B) -> Result<(), ApiError> {
        self.call::<Value, B>(kind, Method::POST, path, Some(body))
            .await
            .map(|_| ())
    }

    // ===== Authenticated calls =====

    /// GET any API path with the session's credential
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call::<T, ()>(CallKind::Session, Method::GET, path, None).await
    }

    /// POST a JSON body to any API path with the session's credential
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.call(CallKind::Session, Method::POST, path, Some(body)).await
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload, ApiError> {
        self.call(CallKind::CredentialExchange, Method::POST, "/auth/register", Some(request))
            .await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError> {
        self.call(CallKind::CredentialExchange, Method::POST, "/auth/login", Some(request))
            .await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.ack(CallKind::Session, "/auth/logout", &json!({})).await
    }

    async fn fetch_current_user(&self) -> Result<User, ApiError> {
        self.call::<User, ()>(CallKind::Session, Method::GET, "/auth/me", None)
            .await
    }

    async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        self.ack(CallKind::CredentialExchange, "/auth/forgot-password", &json!({ "email": email }))
            .await
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        let body = json!({ "token": token, "newPassword": new_password });
        self.ack(CallKind::CredentialExchange, "/auth/reset-password", &body)
            .await
    }

    async fn verify_email(&self, token: &str) -> Result<(), ApiError> {
        self.ack(CallKind::CredentialExchange, "/auth/verify-email", &json!({ "token": token }))
            .await
    }

    async fn resend_verification_email(&self, email: &str) -> Result<(), ApiError> {
        self.ack(CallKind::CredentialExchange, "/auth/resend-verification", &json!({ "email": email }))
            .await
    }
}

//! Session actions against a mock Auth API over HTTP.

use std::time::Duration;

use serde_json::{json, Value};
use sessionward_core::{
    ApiClient, AuthStatus, ErrorCode, ErrorKind, LoginRequest, RegisterRequest, SessionHandle,
    SessionManager, TokenStore,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn user_json() -> Value {
    json!({
        "id": "u_1",
        "email": "a@x.com",
        "name": "A",
        "createdAt": "2026-01-02T03:04:05Z"
    })
}

fn auth_payload(token: &str) -> Value {
    json!({ "user": user_json(), "accessToken": token })
}

async fn setup() -> (MockServer, SessionManager<ApiClient>) {
    let server = MockServer::start().await;
    let session = SessionHandle::new(TokenStore::in_memory());
    let api = ApiClient::with_base_url(&server.uri(), Duration::from_secs(5), &session)
        .expect("Failed to build client");
    (server, SessionManager::new(api, session))
}

fn authorization(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn login(server: &MockServer, manager: &SessionManager<ApiClient>, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_payload(token)))
        .up_to_n_times(1)
        .mount(server)
        .await;
    manager
        .login(&LoginRequest::new("a@x.com", "pw123456"))
        .await
        .expect("login");
}

#[tokio::test]
async fn test_register_then_login_end_to_end() {
    let (server, manager) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({"email": "a@x.com", "password": "pw123456", "name": "A"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_payload("issued-at-signup")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "a@x.com", "password": "pw123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_payload("session-token")))
        .expect(1)
        .mount(&server)
        .await;

    let user = manager
        .register(&RegisterRequest::new("a@x.com", "pw123456", "A"))
        .await
        .expect("register");
    assert_eq!(user.name, "A");
    assert_eq!(manager.session().tokens().access_token(), None);
    assert_eq!(manager.session().status(), AuthStatus::Unauthenticated);

    manager
        .login(&LoginRequest::new("a@x.com", "pw123456"))
        .await
        .expect("login");
    assert_eq!(manager.session().status(), AuthStatus::Authenticated);
    assert_eq!(
        manager.session().tokens().access_token().as_deref(),
        Some("session-token")
    );
}

#[tokio::test]
async fn test_bearer_header_only_with_stored_token() {
    let (server, manager) = setup().await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let _: Value = manager.api().get_json("/reports").await.expect("anonymous call");
    login(&server, &manager, "tok-123").await;
    let _: Value = manager.api().get_json("/reports").await.expect("authenticated call");

    let requests = server.received_requests().await.expect("recording enabled");
    let reports: Vec<&Request> = requests.iter().filter(|r| r.url.path() == "/reports").collect();
    assert_eq!(reports.len(), 2);
    assert_eq!(authorization(reports[0]), None);
    assert_eq!(authorization(reports[1]).as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn test_initialize_restores_with_bearer() {
    let (server, manager) = setup().await;
    manager.session().tokens().save("stored", None).expect("save");

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer stored"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    let user = manager.initialize().await.expect("restored user");
    assert_eq!(user.email, "a@x.com");
    assert!(manager.session().is_authenticated());
}

#[tokio::test]
async fn test_initialize_with_rejected_token_clears() {
    let (server, manager) = setup().await;
    manager.session().tokens().save("revoked", None).expect("save");

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "UNAUTHENTICATED", "message": "Token expired"}
        })))
        .mount(&server)
        .await;

    assert_eq!(manager.initialize().await, None);
    assert_eq!(manager.session().status(), AuthStatus::Unauthenticated);
    assert_eq!(manager.session().current_user(), None);
    assert_eq!(manager.session().tokens().access_token(), None);
}

#[tokio::test]
async fn test_initialize_without_token_sends_nothing() {
    let (server, manager) = setup().await;

    manager.initialize().await;

    assert_eq!(manager.session().status(), AuthStatus::Unauthenticated);
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_wrong_password_keeps_store_untouched() {
    let (server, manager) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "INVALID_CREDENTIALS", "message": "Wrong email or password"}
        })))
        .mount(&server)
        .await;

    let err = manager
        .login(&LoginRequest::new("a@x.com", "wrong-password"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Credential);
    assert_eq!(manager.session().status(), AuthStatus::Error);
    assert_eq!(manager.session().current_user(), None);
    assert_eq!(manager.session().tokens().access_token(), None);
}

#[tokio::test]
async fn test_forbidden_from_unrelated_endpoint_ends_session() {
    let (server, manager) = setup().await;
    login(&server, &manager, "tok").await;

    Mock::given(method("GET"))
        .and(path("/projects/42"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "FORBIDDEN", "message": "Account suspended"}
        })))
        .mount(&server)
        .await;

    let err = manager
        .api()
        .get_json::<Value>("/projects/42")
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(&ErrorCode::Forbidden));
    assert_eq!(manager.session().status(), AuthStatus::Unauthenticated);
    assert_eq!(manager.session().tokens().access_token(), None);
}

#[tokio::test]
async fn test_graphql_forbidden_in_ok_response_ends_session() {
    let (server, manager) = setup().await;
    login(&server, &manager, "tok").await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "Account disabled", "extensions": {"code": "FORBIDDEN"}}]
        })))
        .mount(&server)
        .await;

    let result = manager
        .api()
        .post_json::<Value, _>("/graphql", &json!({"query": "{ me { id } }"}))
        .await;

    assert!(result.is_err());
    assert!(!manager.session().is_authenticated());
    assert_eq!(manager.session().tokens().access_token(), None);
}

#[tokio::test]
async fn test_other_error_codes_pass_through() {
    let (server, manager) = setup().await;
    login(&server, &manager, "tok").await;

    Mock::given(method("GET"))
        .and(path("/projects/7"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "NOT_FOUND", "message": "No such project"}
        })))
        .mount(&server)
        .await;

    let err = manager.api().get_json::<Value>("/projects/7").await.unwrap_err();

    assert_eq!(err.code(), Some(&ErrorCode::NotFound));
    assert!(manager.session().is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_when_server_errors() {
    let (server, manager) = setup().await;
    login(&server, &manager, "tok").await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    manager.logout().await;

    assert_eq!(manager.session().status(), AuthStatus::Unauthenticated);
    assert_eq!(manager.session().tokens().access_token(), None);
}

#[tokio::test]
async fn test_recovery_flows_hit_their_endpoints() {
    let (server, manager) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .and(body_json(json!({"email": "a@x.com"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/reset-password"))
        .and(body_json(json!({"token": "reset-tok", "newPassword": "newpass123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify-email"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "BAD_USER_INPUT", "message": "Verification link already used"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    manager.forgot_password("a@x.com").await.expect("forgot");
    manager
        .reset_password("reset-tok", "newpass123")
        .await
        .expect("reset");
    let err = manager.verify_email("used-tok").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(manager.session().status(), AuthStatus::Idle);
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let (server, manager) = setup().await;
    login(&server, &manager, "tok").await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["weekly"])))
        .mount(&server)
        .await;

    let reports: Vec<String> = manager.api().get_json("/reports").await.expect("retried call");

    assert_eq!(reports, vec!["weekly".to_string()]);
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.iter().filter(|r| r.url.path() == "/reports").count(), 2);
}

#[tokio::test]
async fn test_persistent_rate_limit_surfaces_without_teardown() {
    let (server, manager) = setup().await;
    login(&server, &manager, "tok").await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&server)
        .await;

    let err = manager.api().get_json::<Value>("/reports").await.unwrap_err();

    assert_eq!(err.code(), Some(&ErrorCode::RateLimited));
    assert!(manager.session().is_authenticated());
    assert_eq!(manager.session().tokens().access_token().as_deref(), Some("tok"));
}

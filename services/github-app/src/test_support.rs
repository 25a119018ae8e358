//! Local stand-in for the GitHub REST API used by the unit tests.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const TEST_APP_KEY: &str = include_str!("../tests/fixtures/test-app-key.pem");
pub const TEST_APP_PUBLIC_KEY: &str = include_str!("../tests/fixtures/test-app-key.pub.pem");

pub const MOCK_INSTALLATION_TOKEN: &str = "ghs_mock_installation_token";
pub const MOCK_HEAD_SHA: &str = "3f786850e387550fdab836ed7e6dc881de23001b";
pub const MOCK_COMMENT_ID: u64 = 1_296_269;
/// PR number the mock answers with 404
pub const MISSING_PR_NUMBER: u64 = 404;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// How the token endpoint answers
#[derive(Debug, Clone, Copy)]
enum TokenMode {
    Issue,
    Reject,
    Empty,
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    token_mode: TokenMode,
}

impl MockState {
    fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) {
        let authorization = headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let body = serde_json::from_slice(body).unwrap_or(Value::Null);
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.as_str().to_string(),
            path: uri.path().to_string(),
            authorization,
            body,
        });
    }
}

pub struct MockGithubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockGithubServer {
    pub async fn start() -> Self {
        Self::start_with(TokenMode::Issue).await
    }

    /// Server whose token endpoint answers 401
    pub async fn start_rejecting_tokens() -> Self {
        Self::start_with(TokenMode::Reject).await
    }

    /// Server whose token endpoint answers 201 with an empty token
    pub async fn start_issuing_empty_tokens() -> Self {
        Self::start_with(TokenMode::Empty).await
    }

    async fn start_with(token_mode: TokenMode) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            requests: requests.clone(),
            token_mode,
        };

        let app = Router::new()
            .route("/app/installations/:id/access_tokens", post(access_token))
            .route("/repos/:owner/:repo/pulls/:number", get(pull_request))
            .route("/repos/:owner/:repo/statuses/:sha", post(create_status))
            .route("/repos/:owner/:repo/issues/:number/comments", post(create_comment))
            .route("/repos/:owner/:repo/issues/comments/:id", patch(update_comment))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{address}"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn access_token(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.record(&method, &uri, &headers, &body);
    let token = match state.token_mode {
        TokenMode::Reject => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "A JSON web token could not be decoded"})),
            );
        }
        TokenMode::Issue => MOCK_INSTALLATION_TOKEN,
        TokenMode::Empty => "",
    };
    (
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "expires_at": "2030-01-01T00:00:00Z",
        })),
    )
}

async fn pull_request(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.record(&method, &uri, &headers, &body);
    if uri.path().ends_with(&format!("/pulls/{MISSING_PR_NUMBER}")) {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"})));
    }
    (StatusCode::OK, Json(json!({"head": {"sha": MOCK_HEAD_SHA}})))
}

async fn create_status(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.record(&method, &uri, &headers, &body);
    (StatusCode::CREATED, Json(json!({"id": 1, "state": "pending"})))
}

async fn create_comment(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.record(&method, &uri, &headers, &body);
    (StatusCode::CREATED, Json(json!({"id": MOCK_COMMENT_ID})))
}

async fn update_comment(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.record(&method, &uri, &headers, &body);
    (StatusCode::OK, Json(json!({"id": MOCK_COMMENT_ID})))
}

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use mycloud::{
    Client, ClientConfig, TokenPair,
    store::{MemoryTokenStore, TokenStore},
};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::Semaphore, task::JoinHandle};

// Re-export tokio test macro for convenience
pub use tokio;

/// Build a JWT-shaped token whose `exp` lies `ttl` from now.
///
/// `label` ends up in the payload so tokens issued for different purposes
/// never compare equal.
pub fn token(label: &str, ttl: Duration) -> String {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .saturating_add(ttl)
        .as_secs();
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = Base64UrlUnpadded::encode_string(
        json!({ "exp": exp, "jti": label }).to_string().as_bytes(),
    );
    format!("{header}.{payload}.signature")
}

/// A token valid for a day.
pub fn long_lived(label: &str) -> String {
    token(label, Duration::from_secs(24 * 60 * 60))
}

pub fn demo_user() -> Value {
    json!({
        "id": 7,
        "username": "demo",
        "email": "demo@example.com",
        "first_name": "Demo",
        "last_name": "User",
        "is_staff": false,
        "is_superuser": false
    })
}

pub fn file_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "original_name": name,
        "size": 1024,
        "comment": null,
        "uploaded_at": "2025-01-01T00:00:00Z",
        "last_download": null,
        "public_link": null
    })
}

/// Everything the mock backend counts and serves.
#[derive(Debug)]
pub struct MockState {
    /// The only access token the backend currently accepts.
    pub accepted: Mutex<String>,
    /// Access token handed out by the next successful refresh.
    pub next_access: Mutex<String>,
    pub refresh_fails: AtomicBool,
    /// Refresh hands out a token the other endpoints keep rejecting.
    pub refresh_not_honoured: AtomicBool,
    pub refresh_delay: Mutex<Duration>,
    pub logout_fails: AtomicBool,
    pub register_returns_tokens: AtomicBool,
    /// Holds mutating file requests until permits are added.
    pub hold: Semaphore,
    pub holding: AtomicBool,

    pub files: Mutex<Vec<Value>>,
    pub users: Mutex<Vec<Value>>,

    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub files_calls: AtomicUsize,
    pub uploaded_bytes: AtomicUsize,
    pub last_bearer: Mutex<Option<String>>,
    pub last_comment: Mutex<Option<String>>,
}

impl MockState {
    fn new() -> Self {
        Self {
            accepted: Mutex::new(long_lived("a1")),
            next_access: Mutex::new(long_lived("a2")),
            refresh_fails: AtomicBool::new(false),
            refresh_not_honoured: AtomicBool::new(false),
            refresh_delay: Mutex::new(Duration::ZERO),
            logout_fails: AtomicBool::new(false),
            register_returns_tokens: AtomicBool::new(true),
            hold: Semaphore::new(0),
            holding: AtomicBool::new(false),
            files: Mutex::new(vec![file_json(42, "report.pdf"), file_json(43, "notes.txt")]),
            users: Mutex::new(vec![
                json!({"id": 7, "username": "demo", "email": "demo@example.com", "is_staff": false, "is_active": true, "file_count": 2, "total_size": 2048}),
                json!({"id": 8, "username": "bob", "email": "bob@example.com", "is_staff": true, "is_active": true, "file_count": 0, "total_size": 0}),
            ]),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            files_calls: AtomicUsize::new(0),
            uploaded_bytes: AtomicUsize::new(0),
            last_bearer: Mutex::new(None),
            last_comment: Mutex::new(None),
        }
    }

    pub fn accepted(&self) -> String {
        self.accepted.lock().unwrap().clone()
    }

    /// Stop accepting the current access token, as if it expired server-side.
    pub fn revoke_access(&self) {
        *self.accepted.lock().unwrap() = "revoked".to_string();
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        *self.last_bearer.lock().unwrap() = bearer.clone();
        if bearer.as_deref() == Some(self.accepted().as_str()) {
            Ok(())
        } else {
            Err(unauthorized("Given token not valid for any token type"))
        }
    }

    async fn held(&self) {
        if self.holding.load(Ordering::SeqCst) {
            self.hold.acquire().await.unwrap().forget();
        }
    }
}

fn unauthorized(detail: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
}

/// In-process MyCloud backend on an ephemeral port.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::new());
        let app = Router::new()
            .route("/api/health/", get(health))
            .route("/api/auth/login/", post(login))
            .route("/api/auth/register/", post(register))
            .route("/api/auth/token/refresh/", post(refresh))
            .route("/api/auth/user/me/", get(me))
            .route("/api/auth/logout/", post(logout))
            .route("/api/files/", get(list_files))
            .route("/api/files/upload/", post(upload))
            .route("/api/files/{id}/", delete(delete_file))
            .route("/api/files/{id}/rename/", patch(rename_file))
            .route("/api/files/{id}/comment/", patch(comment_file))
            .route("/api/files/{id}/download/", get(download_file))
            .route("/api/admin/users/", get(list_users))
            .route("/api/admin/users/{id}/", patch(update_user))
            .route("/api/admin/users/{id}/delete/", delete(delete_user))
            .layer(DefaultBodyLimit::disable())
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            addr,
            state,
            server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url()).unwrap()
    }

    /// A client with an empty in-memory store.
    pub fn client(&self) -> (Client, Arc<MemoryTokenStore>) {
        self.client_with(self.config())
    }

    pub fn client_with(&self, config: ClientConfig) -> (Client, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        let client = Client::open(config, store.clone()).unwrap();
        (client, store)
    }

    /// A client already logged in as `demo`.
    pub async fn logged_in(&self) -> (Client, Arc<MemoryTokenStore>) {
        self.logged_in_with(self.config()).await
    }

    pub async fn logged_in_with(&self, config: ClientConfig) -> (Client, Arc<MemoryTokenStore>) {
        let (client, store) = self.client_with(config);
        client
            .session()
            .login(&mycloud::Credentials::new("demo", "Pw1!"))
            .await
            .unwrap();
        (client, store)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Tokens currently in `store`.
pub fn stored(store: &MemoryTokenStore) -> Option<TokenPair> {
    store.load().unwrap()
}

type Shared = State<Arc<MockState>>;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn login(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["username"] == "demo" && body["password"] == "Pw1!" {
        Json(json!({
            "access": state.accepted(),
            "refresh": "r1",
            "user": demo_user(),
        }))
        .into_response()
    } else {
        unauthorized("No active account found with the given credentials")
    }
}

async fn register(State(state): Shared, Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "username": ["A user with that username already exists."] })),
        )
            .into_response();
    }
    let user = json!({
        "id": 9,
        "username": body["username"],
        "email": body["email"],
        "is_staff": false,
        "is_superuser": false
    });
    if state.register_returns_tokens.load(Ordering::SeqCst) {
        (
            StatusCode::CREATED,
            Json(json!({
                "tokens": { "access": state.accepted(), "refresh": "r9" },
                "user": user,
            })),
        )
            .into_response()
    } else {
        (StatusCode::CREATED, Json(user)).into_response()
    }
}

async fn refresh(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *state.refresh_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if state.refresh_fails.load(Ordering::SeqCst) || body["refresh"].as_str().is_none() {
        return unauthorized("Token is invalid or expired");
    }
    let access = state.next_access.lock().unwrap().clone();
    if !state.refresh_not_honoured.load(Ordering::SeqCst) {
        *state.accepted.lock().unwrap() = access.clone();
    }
    Json(json!({ "access": access })).into_response()
}

async fn me(State(state): Shared, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    Json(demo_user()).into_response()
}

async fn logout(State(state): Shared) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if state.logout_fails.load(Ordering::SeqCst) {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn list_files(
    State(state): Shared,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    state.files_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    // Only bob (8) owns anything besides the signed-in user.
    let files = match query.as_deref() {
        Some("user_id=8") => vec![file_json(50, "bob.txt")],
        Some(_) => Vec::new(),
        None => state.files.lock().unwrap().clone(),
    };
    Json(json!({ "files": files })).into_response()
}

async fn upload(State(state): Shared, headers: HeaderMap, mut form: Multipart) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    let mut name = String::new();
    let mut size = 0usize;
    while let Some(field) = form.next_field().await.unwrap() {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                name = field.file_name().unwrap_or_default().to_string();
                size = field.bytes().await.unwrap().len();
            }
            Some("comment") => {
                let comment = field.text().await.unwrap();
                *state.last_comment.lock().unwrap() = Some(comment);
            }
            _ => {}
        }
    }
    state.uploaded_bytes.fetch_add(size, Ordering::SeqCst);
    let mut file = file_json(100, &name);
    file["size"] = json!(size);
    (StatusCode::CREATED, Json(file)).into_response()
}

async fn delete_file(State(state): Shared, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    state.held().await;
    let mut files = state.files.lock().unwrap();
    let before = files.len();
    files.retain(|f| f["id"] != id);
    if files.len() == before {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "File not found" }))).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn rename_file(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    state.held().await;
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let mut files = state.files.lock().unwrap();
    match files.iter_mut().find(|f| f["id"] == id) {
        Some(file) => {
            file["original_name"] = json!(name);
            Json(json!({ "original_name": name })).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "File not found" }))).into_response(),
    }
}

async fn comment_file(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    let mut files = state.files.lock().unwrap();
    match files.iter_mut().find(|f| f["id"] == id) {
        Some(file) => {
            file["comment"] = body["comment"].clone();
            Json(file.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "File not found" }))).into_response(),
    }
}

async fn download_file(State(state): Shared, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        format!("contents of {id}"),
    )
        .into_response()
}

async fn list_users(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    Json(Value::Array(state.users.lock().unwrap().clone())).into_response()
}

async fn update_user(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    let mut users = state.users.lock().unwrap();
    let Some(user) = users.iter_mut().find(|u| u["id"] == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" }))).into_response();
    };
    if let Some(is_staff) = body.get("is_staff") {
        user["is_staff"] = is_staff.clone();
        return Json(json!({ "status": "ok", "user_id": id, "is_staff": is_staff })).into_response();
    }
    if let Some(is_active) = body.get("is_active") {
        user["is_active"] = is_active.clone();
    }
    Json(user.clone()).into_response()
}

async fn delete_user(State(state): Shared, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    let mut users = state.users.lock().unwrap();
    let before = users.len();
    users.retain(|u| u["id"] != id);
    if users.len() == before {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" }))).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

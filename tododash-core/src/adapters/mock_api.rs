//! Mock todo API server for testing
//!
//! A small HTTP/1.1 server on a random local port that mimics the todo
//! backend closely enough to exercise the gateway, the session and the
//! dashboard end to end:
//! - `POST /api/auth/{register,login,logout}`
//! - `PUT /api/users/{id}`
//! - `GET|POST /api/todos`, `PUT|DELETE /api/todos/{id}`,
//!   `PATCH /api/todos/{id}/toggle-complete`
//! - `GET /health`
//!
//! Every request line is recorded so tests can assert that nothing was sent.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

#[derive(Debug, Clone)]
struct MockUser {
    id: String,
    email: String,
    password: String,
}

#[derive(Debug, Clone, Serialize)]
struct MockTodo {
    id: String,
    title: String,
    description: Option<String>,
    is_completed: bool,
    created_at: String,
    updated_at: String,
    user_id: String,
}

#[derive(Debug, Default)]
struct MockState {
    users: Vec<MockUser>,
    /// token -> user id
    tokens: HashMap<String, String>,
    todos: Vec<MockTodo>,
    next_id: u64,
    requests: Vec<String>,
    fail_todos_with: Option<u16>,
    fail_logout: bool,
    delay: Option<Duration>,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        let token = self.next_id("mock_token");
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }

    fn user_json(user: &MockUser) -> JsonValue {
        json!({ "id": user.id, "email": user.email })
    }
}

fn now_naive() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Mock todo API server
pub struct MockTodoApi {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockTodoApi {
    /// Start a new mock server on a random available port
    pub fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(MockState::default()));

        // Non-blocking accept so the loop can observe shutdown
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Register a user directly, returning its id
    pub fn add_user(&self, email: &str, password: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("user");
        state.users.push(MockUser {
            id: id.clone(),
            email: email.to_string(),
            password: password.to_string(),
        });
        id
    }

    /// Hand out a valid token for an existing user
    pub fn issue_token(&self, user_id: &str) -> String {
        self.state.lock().unwrap().issue_token(user_id)
    }

    /// Store a todo for a user, returning its id
    pub fn seed_todo(&self, user_id: &str, title: &str, description: Option<&str>) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("todo");
        let now = now_naive();
        state.todos.push(MockTodo {
            id: id.clone(),
            title: title.to_string(),
            description: description.map(str::to_string),
            is_completed: false,
            created_at: now.clone(),
            updated_at: now,
            user_id: user_id.to_string(),
        });
        id
    }

    /// Invalidate every token, as if they all expired
    pub fn revoke_all_tokens(&self) {
        self.state.lock().unwrap().tokens.clear();
    }

    /// Make every `/api/todos` request fail with the given status
    pub fn fail_todos_with(&self, status: Option<u16>) {
        self.state.lock().unwrap().fail_todos_with = status;
    }

    /// Make the logout endpoint answer 500
    pub fn fail_logout(&self) {
        self.state.lock().unwrap().fail_logout = true;
    }

    /// Hold every response back for the given time
    pub fn delay_responses(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Recorded request lines, e.g. `POST /api/todos`
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    /// Titles of a user's stored todos
    pub fn stored_titles(&self, user_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .todos
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.title.clone())
            .collect()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockTodoApi {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Request {
    method: String,
    path: String,
    query: HashMap<String, String>,
    bearer: Option<String>,
    body: JsonValue,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut content_length = 0usize;
    let mut bearer = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_lowercase();
        let value = value.trim();
        if name == "content-length" {
            content_length = value.parse().unwrap_or(0);
        } else if name == "authorization" {
            bearer = value.strip_prefix("Bearer ").map(str::to_string);
        }
    }

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let body_bytes = &data[header_end..data.len().min(header_end + content_length)];
    let body = serde_json::from_slice(body_bytes).unwrap_or(JsonValue::Null);

    let (path, query_string) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target.clone(), String::new()),
    };
    let query = query_string
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Some(Request {
        method,
        path,
        query,
        bearer,
        body,
    })
}

fn send_response(stream: &mut TcpStream, status: u16, body: &JsonValue) {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        _ => "Error",
    };
    let body = body.to_string();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn handle_connection(mut stream: TcpStream, state: &Mutex<MockState>) {
    let _ = stream.set_nonblocking(false);
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let delay = state.lock().unwrap().delay;
    if let Some(delay) = delay {
        thread::sleep(delay);
    }
    let (status, body) = route(&request, state);
    send_response(&mut stream, status, &body);
}

fn unauthorized() -> (u16, JsonValue) {
    (401, json!({ "detail": "Could not validate credentials" }))
}

fn route(request: &Request, state: &Mutex<MockState>) -> (u16, JsonValue) {
    let mut state = state.lock().unwrap();
    state
        .requests
        .push(format!("{} {}", request.method, request.path));

    let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();

    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["health"]) => (200, json!({ "status": "healthy", "timestamp": now_naive() })),
        ("POST", ["api", "auth", "register"]) => register(&mut state, &request.body),
        ("POST", ["api", "auth", "login"]) => login(&mut state, &request.body),
        ("POST", ["api", "auth", "logout"]) => {
            if state.fail_logout {
                (500, json!({}))
            } else {
                (200, json!({ "success": true, "message": "Logged out successfully" }))
            }
        }
        (method, ["api", resource, ..]) => {
            let Some(user_id) = request
                .bearer
                .as_ref()
                .and_then(|t| state.tokens.get(t))
                .cloned()
            else {
                return unauthorized();
            };
            match *resource {
                "users" => update_user(&mut state, &user_id, &segments[2..], &request.body),
                "todos" => {
                    if let Some(status) = state.fail_todos_with {
                        return (status, json!({ "detail": "Todo service unavailable" }));
                    }
                    todos(&mut state, &user_id, method, &segments[2..], request)
                }
                _ => (404, json!({ "detail": "Not Found" })),
            }
        }
        _ => (404, json!({ "detail": "Not Found" })),
    }
}

fn credentials(body: &JsonValue) -> Option<(String, String)> {
    let email = body.get("email")?.as_str()?.to_string();
    let password = body.get("password")?.as_str()?.to_string();
    if email.is_empty() || password.is_empty() {
        return None;
    }
    Some((email, password))
}

fn register(state: &mut MockState, body: &JsonValue) -> (u16, JsonValue) {
    let Some((email, password)) = credentials(body) else {
        return (
            422,
            json!({ "error": { "message": "Email and password are required" } }),
        );
    };
    if state.users.iter().any(|u| u.email == email) {
        return (400, json!({ "detail": "Email already registered" }));
    }
    let user = MockUser {
        id: state.next_id("user"),
        email,
        password,
    };
    let token = state.issue_token(&user.id);
    let user_json = MockState::user_json(&user);
    state.users.push(user);
    (
        201,
        json!({
            "success": true,
            "user": user_json,
            "access_token": token,
            "token_type": "bearer"
        }),
    )
}

fn login(state: &mut MockState, body: &JsonValue) -> (u16, JsonValue) {
    let Some((email, password)) = credentials(body) else {
        return (
            422,
            json!({ "error": { "message": "Email and password are required" } }),
        );
    };
    let Some(user) = state
        .users
        .iter()
        .find(|u| u.email == email && u.password == password)
        .cloned()
    else {
        return (401, json!({ "detail": "Incorrect email or password" }));
    };
    let token = state.issue_token(&user.id);
    (
        200,
        json!({
            "success": true,
            "user": MockState::user_json(&user),
            "access_token": token,
            "token_type": "bearer"
        }),
    )
}

fn update_user(
    state: &mut MockState,
    user_id: &str,
    rest: &[&str],
    body: &JsonValue,
) -> (u16, JsonValue) {
    if rest != [user_id] {
        return (404, json!({ "detail": "User not found" }));
    }
    let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) else {
        return (404, json!({ "detail": "User not found" }));
    };
    if let Some(email) = body.get("email").and_then(|v| v.as_str()) {
        user.email = email.to_string();
    }
    (200, json!({ "user": MockState::user_json(user) }))
}

fn todos(
    state: &mut MockState,
    user_id: &str,
    method: &str,
    rest: &[&str],
    request: &Request,
) -> (u16, JsonValue) {
    match (method, rest) {
        ("GET", []) => {
            let completed = request
                .query
                .get("completed")
                .and_then(|v| v.parse::<bool>().ok());
            let page: usize = request
                .query
                .get("page")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            let limit: usize = request
                .query
                .get("limit")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10);

            let matching: Vec<&MockTodo> = state
                .todos
                .iter()
                .rev()
                .filter(|t| t.user_id == user_id)
                .filter(|t| completed.map_or(true, |c| t.is_completed == c))
                .collect();
            let total = matching.len();
            let items: Vec<&MockTodo> = matching
                .into_iter()
                .skip((page - 1) * limit)
                .take(limit)
                .collect();
            (
                200,
                json!({
                    "todos": items,
                    "pagination": {
                        "page": page,
                        "limit": limit,
                        "total": total,
                        "has_next": page * limit < total,
                        "has_prev": page > 1,
                        "pages": (total + limit - 1) / limit
                    }
                }),
            )
        }
        ("POST", []) => {
            let title = request
                .body
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            if title.trim().is_empty() {
                return (
                    422,
                    json!({ "detail": [{ "loc": ["body", "title"], "msg": "field required" }] }),
                );
            }
            let id = state.next_id("todo");
            let now = now_naive();
            let todo = MockTodo {
                id,
                title,
                description: request
                    .body
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                is_completed: false,
                created_at: now.clone(),
                updated_at: now,
                user_id: user_id.to_string(),
            };
            state.todos.push(todo.clone());
            (201, json!({ "todo": todo }))
        }
        (method, [id, tail @ ..]) => {
            let Some(index) = state
                .todos
                .iter()
                .position(|t| t.id == *id && t.user_id == user_id)
            else {
                return (404, json!({ "detail": "Todo not found" }));
            };
            match (method, tail) {
                ("PUT", []) => {
                    let body = &request.body;
                    let todo = &mut state.todos[index];
                    if let Some(title) = body.get("title").and_then(|v| v.as_str()) {
                        todo.title = title.to_string();
                    }
                    if let Some(description) = body.get("description").and_then(|v| v.as_str()) {
                        todo.description = Some(description.to_string());
                    }
                    if let Some(done) = body.get("is_completed").and_then(|v| v.as_bool()) {
                        todo.is_completed = done;
                    }
                    todo.updated_at = now_naive();
                    (200, json!({ "todo": todo }))
                }
                ("DELETE", []) => {
                    state.todos.remove(index);
                    (200, json!({ "success": true, "message": "Todo deleted successfully" }))
                }
                ("PATCH", ["toggle-complete"]) => {
                    let todo = &mut state.todos[index];
                    todo.is_completed = !todo.is_completed;
                    todo.updated_at = now_naive();
                    (200, json!({ "todo": todo }))
                }
                _ => (404, json!({ "detail": "Not Found" })),
            }
        }
        _ => (404, json!({ "detail": "Not Found" })),
    }
}

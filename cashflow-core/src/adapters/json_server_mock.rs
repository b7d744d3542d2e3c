//! Mock json-server for testing
//!
//! A small HTTP server over `std::net` that serves a `/transactions`
//! collection the way json-server does, so the HTTP client can be tested
//! without a running backend:
//! - `GET /transactions` honours `type`, `deletedAt`, `deletedAt:ne`, `_page`
//!   and `_per_page`, and answers in one of the listing shapes below
//! - `GET|PATCH|DELETE /transactions/{id}`, `POST /transactions`

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};
use url::form_urlencoded;

use crate::domain::query::sort_newest_first;
use crate::domain::{Transaction, TransactionPatch};

/// How listing responses are shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// Bare array, no total (json-server 1.x without `_page`)
    BareArray,
    /// Bare array plus `X-Total-Count` (json-server 0.x)
    HeaderTotal,
    /// `{ first, prev, next, last, pages, items, data }` (json-server 1.x with `_page`)
    PageObject,
}

/// Configuration of the mock server
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub records: Vec<Transaction>,
    pub shape: ListShape,
    /// Answer every request with this status
    pub fail_status: Option<u16>,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            shape: ListShape::BareArray,
            fail_status: None,
            delay_ms: 0,
        }
    }
}

struct MockState {
    config: MockConfig,
    records: Mutex<Vec<Transaction>>,
    requests: AtomicUsize,
    next_id: AtomicUsize,
}

/// Mock json-server
pub struct MockJsonServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<MockState>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockJsonServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        listener.set_nonblocking(true)?;

        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(MockState {
            records: Mutex::new(config.records.clone()),
            config,
            requests: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        });

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
                        thread::sleep(std::time::Duration::from_millis(5));
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

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Number of requests served so far
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Current server-side records
    pub fn records(&self) -> Vec<Transaction> {
        self.state.records.lock().unwrap().clone()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockJsonServer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Request {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    body: String,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    stream.set_nonblocking(false).ok()?;

    let mut data = Vec::new();
    let mut buffer = [0; 4096];
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
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let mut parts = head.lines().next()?.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    Some(Request {
        method,
        path: path.to_string(),
        query: form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
        body: String::from_utf8_lossy(&data[header_end..]).to_string(),
    })
}

fn handle_connection(mut stream: TcpStream, state: &MockState) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    state.requests.fetch_add(1, Ordering::SeqCst);

    if state.config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(state.config.delay_ms));
    }

    if let Some(status) = state.config.fail_status {
        send_response(&mut stream, status, &[], r#"{"error": "simulated failure"}"#);
        return;
    }

    let id = request
        .path
        .strip_prefix("/transactions/")
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    match (request.method.as_str(), request.path.as_str(), id) {
        ("GET", "/transactions", None) => list(&mut stream, state, &request.query),
        ("POST", "/transactions", None) => create(&mut stream, state, &request.body),
        ("GET", _, Some(id)) => match find(state, &id) {
            Some(tx) => send_json(&mut stream, 200, &json!(tx)),
            None => send_response(&mut stream, 404, &[], "{}"),
        },
        ("PATCH", _, Some(id)) => patch(&mut stream, state, &id, &request.body),
        ("DELETE", _, Some(id)) => {
            let mut records = state.records.lock().unwrap();
            let before = records.len();
            records.retain(|tx| tx.id != id);
            if records.len() == before {
                send_response(&mut stream, 404, &[], "{}");
            } else {
                send_response(&mut stream, 200, &[], "{}");
            }
        }
        _ => send_response(&mut stream, 404, &[], r#"{"error": "Endpoint not found"}"#),
    }
}

fn find(state: &MockState, id: &str) -> Option<Transaction> {
    state.records.lock().unwrap().iter().find(|tx| tx.id == id).cloned()
}

fn list(stream: &mut TcpStream, state: &MockState, query: &[(String, String)]) {
    let param = |key: &str| {
        query
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let mut records: Vec<Transaction> = state.records.lock().unwrap().clone();
    if let Some(kind) = param("type") {
        records.retain(|tx| tx.kind.as_str() == kind);
    }
    if param("deletedAt") == Some("null") {
        records.retain(|tx| !tx.is_deleted());
    }
    if param("deletedAt:ne") == Some("null") {
        records.retain(|tx| tx.is_deleted());
    }
    sort_newest_first(&mut records);

    let total = records.len();
    let page = param("_page").and_then(|v| v.parse::<usize>().ok());
    let per_page = param("_per_page")
        .or_else(|| param("_limit"))
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(10);
    let data: Vec<Transaction> = match page {
        Some(page) => records
            .into_iter()
            .skip(page.saturating_sub(1) * per_page)
            .take(per_page)
            .collect(),
        None => records,
    };

    match state.config.shape {
        ListShape::BareArray => send_json(stream, 200, &json!(data)),
        ListShape::HeaderTotal => {
            let count = total.to_string();
            let body = json!(data).to_string();
            send_response(stream, 200, &[("X-Total-Count", count.as_str())], &body);
        }
        ListShape::PageObject => {
            let pages = total.div_ceil(per_page.max(1));
            let body = json!({
                "first": 1,
                "prev": null,
                "next": null,
                "last": pages,
                "pages": pages,
                "items": total,
                "data": data,
            });
            send_json(stream, 200, &body);
        }
    }
}

fn create(stream: &mut TcpStream, state: &MockState, body: &str) {
    let Ok(mut value) = serde_json::from_str::<JsonValue>(body) else {
        send_response(stream, 400, &[], r#"{"error": "invalid body"}"#);
        return;
    };
    let id = format!("srv_{}", state.next_id.fetch_add(1, Ordering::SeqCst));
    value["id"] = json!(id);

    match serde_json::from_value::<Transaction>(value) {
        Ok(tx) => {
            state.records.lock().unwrap().push(tx.clone());
            send_json(stream, 201, &json!(tx));
        }
        Err(_) => send_response(stream, 400, &[], r#"{"error": "invalid record"}"#),
    }
}

fn patch(stream: &mut TcpStream, state: &MockState, id: &str, body: &str) {
    let Ok(patch) = serde_json::from_str::<TransactionPatch>(body) else {
        send_response(stream, 400, &[], r#"{"error": "invalid body"}"#);
        return;
    };

    let mut records = state.records.lock().unwrap();
    match records.iter_mut().find(|tx| tx.id == id) {
        Some(tx) => {
            tx.apply_patch(&patch);
            let updated = json!(tx);
            drop(records);
            send_json(stream, 200, &updated);
        }
        None => {
            drop(records);
            send_response(stream, 404, &[], "{}");
        }
    }
}

fn send_json(stream: &mut TcpStream, status: u16, body: &JsonValue) {
    send_response(stream, status, &[], &body.to_string());
}

fn send_response(stream: &mut TcpStream, status: u16, headers: &[(&str, &str)], body: &str) {
    let status_text = match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let extra: String = headers
        .iter()
        .map(|(name, value)| format!("{}: {}\r\n", name, value))
        .collect();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        extra,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::generate_demo_transactions;
    use crate::adapters::json_server::JsonServerClient;
    use crate::domain::result::Error;
    use crate::domain::{Filter, ListQuery, TransactionInput, TransactionType};
    use crate::ports::{ListRequest, TransactionApi};

    fn demo_server(shape: ListShape) -> MockJsonServer {
        MockJsonServer::start(MockConfig {
            records: generate_demo_transactions(),
            shape,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_full_listing_filters_by_type_only() {
        let server = demo_server(ListShape::BareArray);
        let client = JsonServerClient::new(&server.base_url()).unwrap();

        let query = ListQuery::new(Filter::Outcome, 1, 10);
        let response = client.list(&ListRequest::full(&query)).await.unwrap();

        assert_eq!(response.total, None);
        assert!(response.records.iter().all(|t| t.kind == TransactionType::Outcome));
        // deleted outcomes are still in the full set
        assert!(response.records.iter().any(|t| t.is_deleted()));
    }

    #[tokio::test]
    async fn test_server_pagination_with_page_object() {
        let server = demo_server(ListShape::PageObject);
        let client = JsonServerClient::with_options(&server.base_url(), 5, true).unwrap();

        let query = ListQuery::new(Filter::All, 2, 5);
        let response = client.list(&ListRequest::paged(&query)).await.unwrap();

        assert_eq!(response.total, Some(22));
        assert_eq!(response.records.len(), 5);
        assert!(response.records.iter().all(|t| !t.is_deleted()));
    }

    #[tokio::test]
    async fn test_server_pagination_with_total_header() {
        let server = demo_server(ListShape::HeaderTotal);
        let client = JsonServerClient::with_options(&server.base_url(), 5, true).unwrap();

        let query = ListQuery::new(Filter::Deleted, 1, 10);
        let response = client.list(&ListRequest::paged(&query)).await.unwrap();

        assert_eq!(response.total, Some(2));
        assert!(response.records.iter().all(|t| t.is_deleted()));
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let server = MockJsonServer::start(MockConfig::default()).unwrap();
        let client = JsonServerClient::new(&server.base_url()).unwrap();

        let created = client
            .create(&TransactionInput::new(TransactionType::Income, 100000))
            .await
            .unwrap();
        assert_eq!(created.amount, 100000);
        assert!(!created.is_deleted());

        let edited = client
            .patch(&created.id, &TransactionPatch::edit(None, Some(120000)))
            .await
            .unwrap();
        assert_eq!(edited.amount, 120000);
        assert_eq!(edited.kind, TransactionType::Income);

        let deleted = client
            .patch(&created.id, &TransactionPatch::soft_delete())
            .await
            .unwrap();
        assert!(deleted.is_deleted());

        let restored = client
            .patch(&created.id, &TransactionPatch::restore())
            .await
            .unwrap();
        assert!(!restored.is_deleted());
        assert_eq!(restored.amount, 120000);

        client.delete(&created.id).await.unwrap();
        assert!(server.records().is_empty());
        assert!(matches!(client.get(&created.id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_server_variant() {
        let server = MockJsonServer::start(MockConfig {
            fail_status: Some(500),
            ..Default::default()
        })
        .unwrap();
        let client = JsonServerClient::new(&server.base_url()).unwrap();

        let result = client.list(&ListRequest::full(&ListQuery::default())).await;
        match result {
            Err(Error::Server { status, message }) => {
                assert_eq!(status, 500);
                assert!(message.contains("simulated failure"));
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let port = {
            let server = MockJsonServer::start(MockConfig::default()).unwrap();
            server.port
        };
        let client = JsonServerClient::with_options(&format!("http://127.0.0.1:{}", port), 2, false)
            .unwrap();

        let result = client.get("anything").await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}

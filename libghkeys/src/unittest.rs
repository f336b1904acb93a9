// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

/// Returns expected HTTP response for the given status code and body string.
pub(crate) fn get_http_response_payload(
    statuscode: &StatusCode,
    body_str: &str,
) -> String {
    // Reply message includes the whole body in case of OK, otherwise empty data.
    match statuscode {
        &StatusCode::OK => format!(
            "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            statuscode.as_u16(),
            statuscode.canonical_reason().unwrap_or_default(),
            body_str.len(),
            body_str
        ),
        _ => format!(
            "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            statuscode.as_u16(),
            statuscode.canonical_reason().unwrap_or_default()
        ),
    }
}

/// Accept incoming connections until the cancellation token is used, then return the count
/// of accepted connections. Each connection is answered with `200 OK` only after `delay`.
pub(crate) async fn serve_requests(
    listener: TcpListener,
    delay: Duration,
    cancel_token: CancellationToken,
) -> u32 {
    let mut request_count = 0;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                break;
            }
            result = listener.accept() => {
                let (mut serverstream, _) = result.unwrap();
                request_count += 1;
                // Answer asynchronously so the next connection is accepted in a timely manner.
                tokio::spawn(async move {
                    sleep(delay).await;
                    let _ = serverstream
                        .write_all(get_http_response_payload(&StatusCode::OK, "too slow").as_bytes())
                        .await;
                });
            }
        }
    }

    request_count
}

#[derive(Clone)]
enum Route {
    Keys(String),
    Status(StatusCode),
    /// Announces more bytes than it sends, then hangs up.
    Truncated(String),
    /// `301 Moved Permanently` to another path on this server.
    Redirect(String),
}

/// A stand-in for the GitHub key listing service.
///
/// Paths are `/<username>.keys`; unknown users get `404 Not Found`. Every
/// requested path is recorded so tests can assert which users were looked up.
pub(crate) struct KeysServer {
    addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl KeysServer {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let requests: Arc<Mutex<Vec<String>>> = Arc::default();
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn({
            let routes = routes.clone();
            let requests = requests.clone();
            let cancel_token = cancel_token.clone();
            async move {
                loop {
                    tokio::select! {
                        _ = cancel_token.cancelled() => break,
                        result = listener.accept() => {
                            let (stream, _) = result.expect("Failed to accept connection");
                            answer(stream, &routes, &requests).await;
                        }
                    }
                }
            }
        });

        Self {
            addr,
            routes,
            requests,
            cancel_token,
            handle,
        }
    }

    pub(crate) fn with_user(self, username: &str, keys: &str) -> Self {
        self.route(username, Route::Keys(keys.to_string()))
    }

    pub(crate) fn with_status(self, username: &str, status: StatusCode) -> Self {
        self.route(username, Route::Status(status))
    }

    pub(crate) fn with_truncated_keys(self, username: &str, keys: &str) -> Self {
        self.route(username, Route::Truncated(keys.to_string()))
    }

    pub(crate) fn with_redirect(self, username: &str, location: &str) -> Self {
        self.route(username, Route::Redirect(location.to_string()))
    }

    fn route(self, username: &str, route: Route) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("/{username}.keys"), route);
        self
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}:{}", self.addr.ip(), self.addr.port())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Paths requested so far, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) async fn stop(self) {
        self.cancel_token.cancel();
        self.handle.await.unwrap();
    }
}

async fn answer(
    mut stream: TcpStream,
    routes: &Mutex<HashMap<String, Route>>,
    requests: &Mutex<Vec<String>>,
) {
    // Drain the request head; key listing requests never carry a body.
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    requests.lock().unwrap().push(path.clone());

    let route = routes.lock().unwrap().get(&path).cloned();
    let payload = match route {
        Some(Route::Keys(keys)) => {
            get_http_response_payload(&StatusCode::OK, &keys)
        }
        Some(Route::Status(status)) => get_http_response_payload(&status, ""),
        Some(Route::Truncated(keys)) => format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            keys.len() + 1024,
            keys
        ),
        Some(Route::Redirect(location)) => format!(
            "HTTP/1.1 301 Moved Permanently\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        ),
        None => get_http_response_payload(&StatusCode::NOT_FOUND, ""),
    };

    let _ = stream.write_all(payload.as_bytes()).await;
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}

//! Mock HTTP server for integration tests.
//!
//! Provides a minimal HTTP/1.1 server that can:
//! - Accept connections
//! - Reply with a canned status and body
//! - Cut a body short of its declared length
//! - Record received request heads

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};

/// A recorded request head.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request line, e.g. "GET /coins/markets?... HTTP/1.1".
    pub request_line: String,
    /// Lower-cased header lines as (name, value).
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A mock HTTP server for testing.
pub struct MockHttpServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpServer {
    /// Start a server that answers every request with `status` and `body`.
    pub async fn start(status: u16, body: &str) -> Self {
        Self::start_with_length(status, body, body.len()).await
    }

    /// Like `start`, but declares `content_length` and closes the
    /// connection after writing `body`.
    pub async fn start_with_length(status: u16, body: &str, content_length: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let requests_clone = requests.clone();
        let body = body.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let requests = requests_clone.clone();
                        let body = body.clone();
                        tokio::spawn(handle_connection(stream, status, body, content_length, requests));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            requests,
        }
    }

    /// Base URL to hand to the fetcher.
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v3", self.addr)
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    /// Stop accepting connections.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    status: u16,
    body: String,
    content_length: usize,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers = lines
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    requests.lock().await.push(RecordedRequest {
        request_line,
        headers,
    });

    let response = format!(
        "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n{body}"
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

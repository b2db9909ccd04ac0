#![allow(dead_code)]

//! Shared test support: a minimal HTTP stub that can actually go away
//!
//! Unlike a pooled mock server, killing a [`StubServer`] closes its port,
//! which is what the offline-fallback paths need to observe.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct StubServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    /// Serve every request with the given status and body
    pub async fn start(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::start_with_delay(status, content_type, body, Duration::ZERO).await
    }

    /// Serve every request after a fixed delay, to hold callers open
    pub async fn start_with_delay(
        status: u16,
        content_type: &str,
        body: impl Into<Vec<u8>>,
        delay: Duration,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("stub server addr");
        let body = body.into();
        let content_type = content_type.to_string();
        let hits = Arc::new(AtomicUsize::new(0));
        let server_hits = hits.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                let body = body.clone();
                let content_type = content_type.clone();
                let hits = server_hits.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 8192];
                    let _ = sock.read(&mut buf).await;
                    hits.fetch_add(1, Ordering::SeqCst);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let head = format!(
                        "HTTP/1.1 {} Stub\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                        status,
                        content_type,
                        body.len()
                    );
                    let _ = sock.write_all(head.as_bytes()).await;
                    let _ = sock.write_all(&body).await;
                    let _ = sock.shutdown().await;
                });
            }
        });

        Self { addr, handle, hits }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Stop listening. The port refuses connections afterwards, so callers
    /// see a real network failure rather than an HTTP error.
    pub async fn kill(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

/// A localhost URL whose port is closed (connections are refused)
pub fn dead_origin() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("reserve port");
    let port = listener.local_addr().expect("reserved port").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use fx_gateway::config::GatewayConfig;
use fx_gateway::lifecycle::{build_rate_cache, Shutdown, StartupError};
use fx_gateway::HttpServer;

pub const ADMIN_KEY: &str = "test-admin-key";

/// What the mock feed answers with. Changeable while the feed runs.
pub struct FeedScript {
    response: Mutex<(u16, String)>,
    delay: Mutex<Duration>,
    hits: AtomicUsize,
}

impl FeedScript {
    pub fn respond(&self, status: u16, body: impl Into<String>) {
        *self.response.lock().unwrap() = (status, body.into());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub fn rates_body(rates: &[(&str, f64)]) -> String {
    let rates: serde_json::Map<String, serde_json::Value> = rates
        .iter()
        .map(|(code, rate)| (code.to_string(), serde_json::json!(rate)))
        .collect();
    serde_json::json!({ "result": "success", "conversion_rates": rates }).to_string()
}

/// Start a programmable mock rate feed on an ephemeral port.
pub async fn start_mock_feed(rates: &[(&str, f64)]) -> (SocketAddr, Arc<FeedScript>) {
    let script = Arc::new(FeedScript {
        response: Mutex::new((200, rates_body(rates))),
        delay: Mutex::new(Duration::ZERO),
        hits: AtomicUsize::new(0),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let feed = script.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let feed = feed.clone();
                    tokio::spawn(async move { serve_one(socket, feed).await });
                }
                Err(_) => break,
            }
        }
    });

    (addr, script)
}

async fn serve_one(mut socket: TcpStream, feed: Arc<FeedScript>) {
    // Read the request head so closing the socket does not reset the client.
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }

    feed.hits.fetch_add(1, Ordering::SeqCst);
    let delay = *feed.delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let (status, body) = feed.response.lock().unwrap().clone();
    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Gateway config pointed at `feed`, with the limiter off and admin on.
pub fn test_config(feed: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.url = format!("http://{feed}/v6/test/latest/USD");
    config.upstream.timeout_ms = 1_000;
    config.upstream.use_system_proxy = false;
    config.cache.refresh_interval_secs = 0;
    config.breaker.cool_down_ms = 300;
    config.rate_limit.enabled = false;
    config.observability.metrics_enabled = false;
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config
}

pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Load rates and serve the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> Result<Gateway, StartupError> {
    let cache = build_rate_cache(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, cache);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    Ok(Gateway { addr, shutdown })
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use apimocker::{App, ServerOptions};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as seen by a test origin.
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OriginRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What a test origin answers.
#[derive(Debug, Clone)]
pub struct OriginResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OriginResponse {
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), "text/plain".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    /// Body compressed with gzip and labelled `Content-Encoding: gzip`.
    pub fn gzip(status: u16, body: &str) -> Self {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body.as_bytes()).unwrap();
        Self {
            status,
            headers: vec![
                ("Content-Type".into(), "text/plain".into()),
                ("Content-Encoding".into(), "gzip".into()),
            ],
            body: encoder.finish().unwrap(),
        }
    }
}

/// Start a programmable origin on an ephemeral port.
///
/// Every request it receives is also sent on the returned channel.
pub async fn start_programmable_origin<F, Fut>(
    f: F,
) -> (SocketAddr, mpsc::UnboundedReceiver<OriginRequest>)
where
    F: Fn(OriginRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OriginResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let seen_tx = seen_tx.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let _ = seen_tx.send(request.clone());
                let response = f(request).await;
                let _ = socket.write_all(&encode_response(&response)).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, seen_rx)
}

/// Origin that always answers with `response`.
pub async fn start_fixed_origin(
    response: OriginResponse,
) -> (SocketAddr, mpsc::UnboundedReceiver<OriginRequest>) {
    start_programmable_origin(move |_| {
        let response = response.clone();
        async move { response }
    })
    .await
}

async fn read_request(socket: &mut TcpStream) -> Option<OriginRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(OriginRequest {
        method,
        target,
        headers,
        body,
    })
}

fn encode_response(response: &OriginResponse) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {} Test\r\n", response.status);
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body.len()
    ));
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(&response.body);
    bytes
}

/// Write `config` as `apimocker.json` in a fresh temporary directory.
pub fn write_config(config: &Value) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("apimocker.json");
    std::fs::write(&path, serde_json::to_vec_pretty(config).unwrap()).unwrap();
    (dir, path)
}

/// Replace the file at `path` in one rename so a watcher never sees it half written.
pub fn replace_config(path: &Path, content: &str) {
    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, content).unwrap();
    std::fs::rename(&staging, path).unwrap();
}

/// Options for a test server on an ephemeral localhost port.
pub fn test_options(config_path: PathBuf) -> ServerOptions {
    ServerOptions {
        config_path,
        bind_host: "127.0.0.1".to_string(),
        port: Some(0),
        poll_interval: Duration::from_millis(50),
        ..ServerOptions::default()
    }
}

/// A started server together with the directory holding its config.
pub struct TestServer {
    pub app: App,
    pub dir: TempDir,
    pub config_path: PathBuf,
    pub base_url: String,
}

pub async fn start_server(config: Value) -> TestServer {
    let (dir, config_path) = write_config(&config);
    let mut app = App::bootstrap(test_options(config_path.clone()))
        .await
        .unwrap();
    let addr = app.start().await.unwrap();

    TestServer {
        app,
        dir,
        config_path,
        base_url: format!("http://{addr}"),
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// The configuration used by most scenarios: project `test` without an origin.
pub fn base_config() -> Value {
    serde_json::json!({
        "projects": [
            {
                "uuid": "p-test",
                "name": "test",
                "endpoints": [
                    {"uuid": "empty", "path": "/empty", "method": "GET", "enable": true,
                     "response": {}},
                    {"uuid": "post-object", "path": "/object", "method": "POST", "enable": true,
                     "response": {"hey": "I am working"}},
                    {"uuid": "post-object-body", "path": "/object", "method": "POST", "enable": true,
                     "request": {"params": "", "body": {"param": "value"}},
                     "response": {"hey": "I am working with body"}},
                    {"uuid": "get-object", "path": "/object", "method": "GET", "enable": true,
                     "response": {"hey": "I am working"}},
                    {"uuid": "get-object-params", "path": "/object", "method": "GET", "enable": true,
                     "request": {"params": "?param=value", "body": {}},
                     "response": {"hey": "I am working with params"}},
                    {"uuid": "created", "path": "/created", "method": "PUT", "enable": true,
                     "statusCode": 201, "response": "made it"},
                    {"uuid": "disabled", "path": "/disabled", "method": "GET", "enable": false,
                     "response": "never"},
                    {"uuid": "slow", "path": "/slow", "method": "GET", "enable": true,
                     "timeout": 400, "response": {"generation": "old"}}
                ]
            },
            {
                "uuid": "p-slug",
                "name": "slug_name_test",
                "slug": "test-slug",
                "endpoints": [
                    {"uuid": "slugged", "path": "/hello", "method": "GET", "enable": true,
                     "response": "from slug"}
                ]
            }
        ],
        "result": {"httpPort": 3000, "httpsPort": 3001}
    })
}

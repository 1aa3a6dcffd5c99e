//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response as AxumResponse;
use essen::{EssenConfig, EssenError, HttpServer, Request, Response, Shutdown, UploadConfig, UploadSettings};

/// A running server that stops when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub uploads: UploadSettings,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the echo handler on an ephemeral port, uploading into `upload_dir`.
pub async fn start_server(upload_dir: Option<&Path>) -> TestServer {
    let mut config = EssenConfig::default();
    config.server.bind_address = "127.0.0.1:0".to_string();
    config.upload = upload_dir.map(UploadConfig::new);

    let server = HttpServer::new(config, echo_params);
    let uploads = server.uploads();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        uploads,
        shutdown,
    }
}

/// Look up every name listed in `X-Params` and reply with
/// `name=value` or `name!Kind` lines, one per parameter.
pub async fn echo_params(mut req: Request, res: Response) -> Result<AxumResponse, EssenError> {
    let names: Vec<String> = req
        .header("x-params")
        .map(|v| v.split(',').map(str::to_owned).collect())
        .unwrap_or_default();

    let mut lines = Vec::new();
    for name in names {
        match req.param(&name).await {
            Ok(v) => lines.push(format!("{}={}", name, v)),
            Err(e @ EssenError::FormParseError(_)) => return Err(e),
            Err(e) => lines.push(format!("{}!{}", name, e.kind())),
        }
    }
    Ok(res.send(StatusCode::OK, lines.join("\n")))
}

/// Client without connection pooling so every test request is independent.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

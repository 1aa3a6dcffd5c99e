//! Essen demo server.
//!
//! Serves a single handler that echoes the requested parameters as JSON,
//! which makes it easy to exercise the query, form and multipart sources
//! with curl:
//!
//! ```text
//! curl 'localhost:8080/?name=essen'
//! curl -d 'name=essen' localhost:8080/
//! curl -F name=essen -F upload=@Cargo.toml localhost:8080/
//! ```
//!
//! The names to echo come from the `X-Essen-Params` header (comma
//! separated) and default to `name` and `upload`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::Response as AxumResponse;
use clap::Parser;
use serde::Serialize;

use essen::config::validation::validate_config;
use essen::config::{load_config, ConfigError, EssenConfig};
use essen::{EssenError, Request, Response, UploadConfig};

#[derive(Parser)]
#[command(name = "essen")]
#[command(about = "Essen demo server echoing request parameters", long_about = None)]
struct Cli {
    /// TOML configuration file (watched for upload directory changes).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the upload directory.
    #[arg(short, long)]
    upload_dir: Option<PathBuf>,

    /// Override the log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Serialize)]
struct Echo {
    method: String,
    path: String,
    host: Option<String>,
    source: String,
    params: BTreeMap<String, EchoValue>,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum EchoValue {
    Value(String),
    Error { kind: &'static str, message: String },
}

async fn echo(mut req: Request, res: Response) -> Result<AxumResponse, EssenError> {
    let names: Vec<String> = match req.header("x-essen-params") {
        Ok(list) => list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
        Err(_) => vec!["name".to_string(), "upload".to_string()],
    };

    let mut params = BTreeMap::new();
    for name in names {
        let value = match req.param(&name).await {
            Ok(v) => EchoValue::Value(v),
            Err(EssenError::FormParseError(m)) => return Err(EssenError::FormParseError(m)),
            Err(e) => EchoValue::Error {
                kind: e.kind(),
                message: e.message().to_string(),
            },
        };
        params.insert(name, value);
    }

    let echo = Echo {
        method: req.method().to_string(),
        path: req.path().to_string(),
        host: req.host().map(str::to_owned),
        source: format!("{:?}", req.source_kind()),
        params,
    };
    res.json(StatusCode::OK, &echo)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EssenConfig::default(),
    };

    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(dir) = cli.upload_dir {
        config.upload = Some(UploadConfig::new(dir));
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    essen::lifecycle::serve(config, cli.config.as_deref(), echo).await?;
    Ok(())
}

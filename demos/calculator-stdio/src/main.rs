//! # Calculator over stdio
//!
//! Reads one JSON-RPC document per line from stdin and writes each response
//! as one line on stdout. Notifications produce no output. Logs go to stderr.
//!
//! ## Usage
//! ```bash
//! echo '{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}' \
//!   | cargo run --package calculator-stdio
//!
//! echo '[{"jsonrpc":"2.0","method":"sum","params":[1,2,3,4],"id":"a"},
//!        {"jsonrpc":"2.0","method":"subtract","params":{"a":5,"b":3},"id":"b"}]' | tr -d '\n' \
//!   | RUST_LOG=debug cargo run --package calculator-stdio -- --max-concurrency 4
//! ```
//!
//! ## Config file
//! ```toml
//! max_concurrency = 8
//! notification_mode = "inline"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clamo_json_rpc_server::prelude::*;
use clap::Parser;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with dispatcher settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Batch members processed at once (overrides the config file)
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Run notifications to completion before reading the next line
    #[arg(long, default_value = "false")]
    inline_notifications: bool,
}

fn load_config(args: &Args) -> Result<DispatcherConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        }
        None => DispatcherConfig::default(),
    };

    if let Some(max_concurrency) = args.max_concurrency {
        config.max_concurrency = max_concurrency;
    }
    if args.inline_notifications {
        config.notification_mode = NotificationMode::Inline;
    }
    Ok(config)
}

async fn add(args: BoundArguments) -> Result<Value, OperationError> {
    let a: i64 = args.arg(0)?;
    let b: i64 = args.arg(1)?;
    Ok(json!(a + b))
}

async fn subtract(args: BoundArguments) -> Result<Value, OperationError> {
    let a: i64 = args.named_arg("a")?;
    let b: i64 = args.named_arg("b")?;
    Ok(json!(a - b))
}

async fn divide(args: BoundArguments) -> Result<Value, OperationError> {
    let a: f64 = args.arg(0)?;
    let b: f64 = args.arg(1)?;
    if b == 0.0 {
        return Err(OperationError::server(-32000, "Division by zero"));
    }
    Ok(json!(a / b))
}

async fn sum(args: BoundArguments) -> Result<Value, OperationError> {
    let values: Vec<i64> = args.rest_args(0)?;
    Ok(json!(values.iter().sum::<i64>()))
}

async fn greet(args: BoundArguments) -> Result<Value, OperationError> {
    let name: String = args.named_arg("name")?;
    let greeting = args
        .opt_named_arg::<String>("greeting")?
        .unwrap_or_else(|| "Hello".to_string());
    Ok(json!(format!("{}, {}!", greeting, name)))
}

async fn version(_: BoundArguments) -> Result<Value, OperationError> {
    Ok(json!(env!("CARGO_PKG_VERSION")))
}

fn calculator() -> OperationTable {
    OperationTable::new()
        .operation("add", ParameterShape::new().required("a").required("b"), add)
        .operation(
            "subtract",
            ParameterShape::new().required_named("a").required_named("b"),
            subtract,
        )
        .operation("divide", ParameterShape::new().required("a").required("b"), divide)
        .operation("sum", ParameterShape::new().variadic("values"), sum)
        .operation(
            "greet",
            ParameterShape::new()
                .required_named("name")
                .optional_named("greeting"),
            greet,
        )
        .internal_operation("version", ParameterShape::new(), version)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let table = calculator();
    let version = table.call_internal("version", BoundArguments::None).await?;
    info!("Starting calculator-stdio {}", version);

    let dispatcher = JsonRpcDispatcher::builder(table)
        .config(config)
        .on_notification_error(|failure| {
            debug!(
                "Notification {:?} dropped: {} {:?}",
                failure.method, failure.error.message, failure.error.data
            )
        })
        .build()?;
    info!(
        "Serving {:?} with max concurrency {}",
        dispatcher.registry().operation_names(),
        dispatcher.config().effective_concurrency()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = dispatcher.handle_str(&line).await {
            stdout.write_all(response.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}

//! `http-tool-proxy` entry point.
//!
//! `serve` runs the tool server on the configured transport; `tools` and
//! `call` act as a client of that server over the same transport.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rmcp::model::JsonObject;
use serde_json::Value;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use http_tool_proxy::client::{self, ClientConfig};
use http_tool_proxy::core::config::{DEFAULT_CONFIG_PATH, Overrides};
use http_tool_proxy::core::{Config, McpServer, TransportConfig, TransportService};

#[derive(Debug, Parser)]
#[command(name = "http-tool-proxy", version, about)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, short, global = true, env = "MCP_CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Transport: stdio, sse or http (aliases: local-pipe, server-push-stream, streamable-request).
    #[arg(long, global = true, env = "MCP_TRANSPORT")]
    transport: Option<String>,

    /// Address to bind (server) or connect to (client).
    #[arg(long, global = true, env = "MCP_HOST")]
    host: Option<String>,

    #[arg(long, global = true, env = "MCP_PORT")]
    port: Option<u16>,

    #[arg(long, global = true, env = "MCP_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the tool server (the default).
    Serve,

    /// Connect to the server and list its tools.
    Tools {
        /// Print the list as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Connect to the server and invoke one tool.
    Call {
        name: String,

        /// One argument; the value is parsed as JSON, falling back to a plain string.
        #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        args: Vec<(String, Value)>,

        /// All arguments as one JSON object; `--arg` entries take precedence.
        #[arg(long)]
        args_json: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?
        .with_overrides(Overrides {
            transport: cli.transport,
            host: cli.host,
            port: cli.port,
            log_level: cli.log_level,
        });

    init_logging(&config.logging.level);
    report_config(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Tools { json } => list_tools(&config, json).await,
        Command::Call {
            name,
            args,
            args_json,
        } => call_tool(&config, name, build_arguments(args, args_json.as_deref())?).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    let transport =
        TransportConfig::from_server_config(&config.server).context("invalid transport settings")?;
    let server = McpServer::new(config).context("failed to build the tool registry")?;
    info!(
        "Starting {} v{} ({} tools)",
        server.name(),
        server.version(),
        server.registry().len()
    );

    let ct = CancellationToken::new();
    tokio::spawn(shutdown_on_ctrl_c(ct.clone()));

    TransportService::new(transport)
        .with_cancellation(ct)
        .run(server)
        .await?;

    info!("Server shutting down");
    Ok(())
}

async fn list_tools(config: &Config, json: bool) -> Result<()> {
    let client_config = ClientConfig::from_config(config)?;
    let tools = client::discover(&client_config)
        .await
        .context("tool discovery failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }
    for tool in &tools {
        println!("{}", tool.name);
        if !tool.description.is_empty() {
            println!("    {}", tool.description);
        }
        println!("    schema: {}", Value::Object(tool.input_schema.clone()));
    }
    Ok(())
}

async fn call_tool(config: &Config, name: String, arguments: JsonObject) -> Result<()> {
    let client_config = ClientConfig::from_config(config)?;
    let text = client::invoke(&client_config, name.as_str(), arguments)
        .await
        .with_context(|| format!("call to '{name}' failed"))?;
    println!("{text}");
    Ok(())
}

fn build_arguments(pairs: Vec<(String, Value)>, json: Option<&str>) -> Result<JsonObject> {
    let mut arguments = match json {
        Some(text) => match serde_json::from_str::<Value>(text).context("--args-json is not valid JSON")? {
            Value::Object(map) => map,
            other => bail!("--args-json must be a JSON object, got {other}"),
        },
        None => JsonObject::new(),
    };
    arguments.extend(pairs);
    Ok(arguments)
}

fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("missing argument name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

async fn shutdown_on_ctrl_c(ct: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Interrupt received");
            ct.cancel();
        }
        Err(e) => warn!("Cannot listen for interrupt: {}", e),
    }
}

/// Logged once the subscriber exists; `Config::load` runs before it does.
fn report_config(config: &Config) {
    let path = config
        .source_path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    info!(
        path = %path,
        tools = config.tools.len(),
        transport = %config.server.transport,
        "Configuration loaded"
    );
}

/// Initialize the logging subsystem.
///
/// Always writes to stderr: under the stdio transport stdout carries protocol
/// traffic.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

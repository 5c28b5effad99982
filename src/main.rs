//! Instana MCP server entry point
//!
//! Resolves flags and environment into an immutable `ServerConfig`, builds
//! the API client and server, and hands off to the transport loop. Exit
//! codes: 0 on clean shutdown, 1 on startup or runtime failure, 2 on
//! flag misuse.

mod client;
mod config;
mod error;
mod middleware;
mod prompts;
mod registry;
mod server;
mod tools;

use crate::client::InstanaApiClient;
use crate::config::{parse_categories, Credentials, ServerConfig, TransportMode};
use crate::server::InstanaServer;
use anyhow::Result;
use clap::{CommandFactory, Parser, ValueEnum};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "instana-mcp", version, about = "MCP server for IBM Instana")]
struct Cli {
    /// Transport used to serve MCP
    #[arg(long, value_enum, default_value = "stdio")]
    transport: TransportMode,

    /// Logging verbosity
    #[arg(long, value_enum, ignore_case = true, default_value = "info")]
    log_level: LogLevel,

    /// Shortcut for --log-level debug
    #[arg(long)]
    debug: bool,

    /// Comma-separated tool categories to enable (default: all).
    /// Known categories: app, events, infra, trending, website
    #[arg(long, value_name = "category1,category2,...")]
    tools: Option<String>,

    /// Port to listen on in streamable-http mode
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

fn is_help_flag(arg: &str) -> bool {
    matches!(arg, "-h" | "--h" | "-help" | "--help")
}

/// Help is only valid on its own: combined with any other argument the
/// invocation is rejected as flag misuse.
fn handle_help_flags() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.iter().any(|arg| is_help_flag(arg.as_str())) {
        return;
    }

    if args.len() > 1 {
        eprintln!("Error: --help cannot be combined with other arguments");
        std::process::exit(2);
    }

    let _ = Cli::command().print_help();
    std::process::exit(0);
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        LevelFilter::DEBUG
    } else {
        cli.log_level.to_filter()
    };

    // stdout carries the protocol in stdio mode; logs always go to stderr
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Missing credentials are fatal in stdio mode. In streamable-http mode the
/// server still starts (so hosts can connect and list tools) and every tool
/// call fails with a classified error instead.
fn resolve_credentials(transport: TransportMode) -> Result<Credentials> {
    match Credentials::from_env() {
        Ok(credentials) => Ok(credentials),
        Err(err) if transport == TransportMode::Stdio => Err(err.into()),
        Err(err) => {
            tracing::warn!("{}; tool calls will fail until credentials are provided", err);
            Ok(Credentials {
                api_token: String::new(),
                base_url: String::new(),
            })
        }
    }
}

#[tokio::main]
async fn run(cli: Cli) -> Result<()> {
    let categories = parse_categories(cli.tools.as_deref());
    match &categories {
        Some(selection) => {
            let mut names: Vec<_> = selection.iter().map(String::as_str).collect();
            names.sort_unstable();
            tracing::info!("Enabled tool categories: {}", names.join(", "));
        }
        None => tracing::info!("Enabled tool categories: all"),
    }

    let config = ServerConfig {
        transport: cli.transport,
        port: cli.port,
        categories,
        ..Default::default()
    };

    let credentials = resolve_credentials(config.transport)?;
    let api = Arc::new(InstanaApiClient::new(&credentials)?);
    let instana = InstanaServer::new(&config, api);

    server::run(&config, instana).await
}

fn main() {
    handle_help_flags();
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(err) = run(cli) {
        tracing::error!("Server error: {:#}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["instana-mcp"]).unwrap();
        assert_eq!(cli.transport, TransportMode::Stdio);
        assert_eq!(cli.log_level, LogLevel::Info);
        assert!(!cli.debug);
        assert!(cli.tools.is_none());
        assert_eq!(cli.port, 8080);
    }

    #[test]
    fn test_transport_and_tools_flags() {
        let cli = Cli::try_parse_from([
            "instana-mcp",
            "--transport",
            "streamable-http",
            "--port",
            "9000",
            "--tools",
            "app,events",
        ])
        .unwrap();
        assert_eq!(cli.transport, TransportMode::StreamableHttp);
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.tools.as_deref(), Some("app,events"));
    }

    #[test]
    fn test_invalid_transport_is_rejected() {
        assert!(Cli::try_parse_from(["instana-mcp", "--transport", "websocket"]).is_err());
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let cli = Cli::try_parse_from(["instana-mcp", "--log-level", "DEBUG"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::Warning.to_filter(), LevelFilter::WARN);
        assert_eq!(LogLevel::Critical.to_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn test_help_flag_detection() {
        assert!(is_help_flag("-h"));
        assert!(is_help_flag("--help"));
        assert!(is_help_flag("--h"));
        assert!(is_help_flag("-help"));
        assert!(!is_help_flag("--helpme"));
        assert!(!is_help_flag("--transport"));
    }
}

//! Taco Bell MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server exposing Taco Bell store search and
//! menu lookup as tools.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use taco_bell_mcp_server::config::Config;
use taco_bell_mcp_server::error::Result;
use taco_bell_mcp_server::mcp::server::McpServer;
use taco_bell_mcp_server::mcp::tools::{ToolHandler, GET_RESTAURANT_MENU, SEARCH_LOCATIONS};
use taco_bell_mcp_server::mcp::types::CallToolResult;
use taco_bell_mcp_server::tacobell::client::TacoBellClient;

/// Taco Bell MCP Server
#[derive(Parser)]
#[command(name = "taco-bell-mcp-server")]
#[command(author, version, about = "Taco Bell MCP Server - A Model Context Protocol server for Taco Bell locations and menus")]
struct Cli {
    /// Override the Taco Bell web services base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Do not append the `_` timestamp parameter to store lookups
    #[arg(long, global = true)]
    no_cache_buster: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for stores near a point and print them
    Search {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,

        /// Only show stores within this many miles
        #[arg(long)]
        radius: Option<f64>,

        /// Maximum number of stores
        #[arg(long)]
        count: Option<usize>,
    },

    /// Print the menu of a store
    Menu {
        /// Store ID, e.g. 042266
        store_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::new()?;
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs))?;
    }
    if cli.no_cache_buster {
        config = config.with_cache_buster(false);
    }

    let client = Arc::new(TacoBellClient::new(config)?);

    match cli.command {
        Some(Commands::Search {
            latitude,
            longitude,
            radius,
            count,
        }) => {
            let args = json!({
                "latitude": latitude,
                "longitude": longitude,
                "radius": radius,
                "count": count,
            });
            let result = ToolHandler::new(client).call_tool(SEARCH_LOCATIONS, args).await;
            print_result(result);
        }
        Some(Commands::Menu { store_id }) => {
            let args = json!({ "store_id": store_id });
            let result = ToolHandler::new(client)
                .call_tool(GET_RESTAURANT_MENU, args)
                .await;
            print_result(result);
        }
        None => {
            // Run MCP server
            let mut server = McpServer::new(client);
            server.run_stdio().await?;
        }
    }

    Ok(())
}

fn print_result(result: CallToolResult) {
    let text = result.first_text().unwrap_or_default();
    if result.is_error {
        eprintln!("{}", text);
        std::process::exit(1);
    }
    println!("{}", text);
}

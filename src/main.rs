//! Sakila MCP Entry Point
//!
//! Subcommands:
//! - `serve` - MCP server on stdio
//! - `tools` - print the catalog of a mode as JSON
//! - `call` - run one operation and print its response
//!
//! stdout carries protocol frames and JSON only. Logs go to stderr.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::info;

use sakila_mcp::logging::init_logging;
use sakila_mcp::{catalog, mcp, DatabaseSettings, Dispatcher, Mode, MySqlDatabase};

/// Sakila MCP - read-only gateway to the Sakila rental database
#[derive(Parser)]
#[command(name = "sakila-mcp")]
#[command(about = "MCP server exposing the Sakila database through validated, read-only operations")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server over stdio
    Serve {
        /// Operation catalog to expose
        #[arg(long, value_enum, default_value_t = Mode::Intent)]
        mode: Mode,
    },

    /// Print the operation catalog as JSON
    Tools {
        /// Operation catalog to print
        #[arg(long, value_enum, default_value_t = Mode::Intent)]
        mode: Mode,
    },

    /// Run one operation and print its response
    Call {
        /// Operation name, e.g. search_films
        operation: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Catalog the operation belongs to
        #[arg(long, value_enum, default_value_t = Mode::Intent)]
        mode: Mode,
    },
}

fn connect() -> anyhow::Result<MySqlDatabase> {
    let settings = DatabaseSettings::load()?;
    info!(?settings, "database settings loaded");
    Ok(MySqlDatabase::new(&settings))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Serve { mode } => {
            let dispatcher = Arc::new(Dispatcher::new(connect()?, mode));
            mcp::serve(dispatcher).await?;
        }
        Commands::Tools { mode } => {
            println!("{}", serde_json::to_string_pretty(&catalog(mode))?);
        }
        Commands::Call { operation, args, mode } => {
            let arguments: Map<String, Value> =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let dispatcher = Dispatcher::new(connect()?, mode);
            let response = dispatcher.call(&operation, &arguments).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rmcp::ServiceExt;
use tracing::info;

mod bridge;
mod catalogue;
mod cmd;
mod mcp;
mod utils;

use bridge::Runner;
use cmd::{CallArgs, FailedJobsArgs, SelftestArgs, ToolsArgs};
use mcp::BridgeServer;

/// s9s MCP - exposes the s9s ClusterControl CLI as MCP tools over stdio.
///
/// Command layout:
///   s9s-mcp [serve]                         Run the MCP server on stdio (default)
///   s9s-mcp selftest [--timeout N] [--json] Run `s9s --version` / `s9s --help` directly
///   s9s-mcp tools [-t TARGET] [--json]      List the tools a server exposes
///   s9s-mcp call <TOOL> [--param k=v ...]   Invoke one tool
///   s9s-mcp failed-jobs [--log] [--json]    Report failed / aborted jobs
///
/// Global flags / env:
///   -v / -vv        Increase verbosity
///   -q / --quiet    Errors only
///   RUST_LOG        Overrides the level derived from -v / -q
///   S9S_MCP_TARGET  Server command for the client commands (default: this binary `serve`)
///
/// Server environment:
///   S9S_BIN, S9S_HOME, CC_HOST, CC_PORT, CC_USER, CC_PASS, CC_KEYFILE
///
/// Examples:
///   s9s-mcp tools
///   s9s-mcp call cluster_list --param flags=--long --json
///   s9s-mcp call job_log --param jobId=6180
///   s9s-mcp failed-jobs --log -t "/opt/s9s-mcp/bin/s9s-mcp serve"
#[derive(Parser, Debug)]
#[command(
    name = "s9s-mcp",
    version,
    author,
    about = "s9s MCP - MCP server for the s9s cluster administration CLI",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server on stdio
    Serve,

    /// Run `s9s --version` and `s9s --help` without MCP
    Selftest(SelftestArgs),

    /// List the tools exposed by a server
    Tools(ToolsArgs),

    /// Invoke a tool
    Call(CallArgs),

    /// Report failed or aborted jobs
    FailedJobs(FailedJobsArgs),
}

async fn serve() -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting s9s MCP server on stdio");
    let service = BridgeServer::new(Runner::from_process_env())
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP server")?;
    let reason = service
        .waiting()
        .await
        .context("MCP server task failed")?;
    info!(?reason, "MCP server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Selftest(args) => cmd::execute_selftest(args).await,
        Commands::Tools(args) => cmd::execute_tools(args).await,
        Commands::Call(args) => cmd::execute_call(args).await,
        Commands::FailedJobs(args) => cmd::execute_failed_jobs(args).await,
    }
}

//! genymotion-mcp: MCP stdio server entry point.
//!
//! Reads configuration from flags and the environment, then serves the tool
//! catalog on stdin/stdout until EOF or Ctrl-C.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use genymotion_mcp::adb::AdbCli;
use genymotion_mcp::dispatch::Dispatcher;
use genymotion_mcp::mcp::McpServer;
use genymotion_mcp::platform::PlatformClient;
use genymotion_mcp::tools::PlatformTools;
use genymotion_mcp::types::{
    AdbConfig, ApiToken, Config, ObservabilityConfig, PlatformConfig, DEFAULT_BASE_URL,
};

#[derive(Debug, Parser)]
#[command(name = "genymotion-mcp")]
#[command(about = "MCP server for the Genymotion SaaS device farm")]
#[command(version)]
struct Cli {
    /// Platform API token
    #[arg(long, env = "GENYMOTION_API_TOKEN", hide_env_values = true, default_value = "")]
    api_token: String,

    /// Platform API base URL
    #[arg(long, env = "GENYMOTION_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value = "10")]
    http_timeout: u64,

    /// Disable the single retry of transient platform failures
    #[arg(long)]
    no_retry: bool,

    /// adb executable
    #[arg(long, env = "ADB_PATH", default_value = "adb")]
    adb_path: PathBuf,

    /// Deadline for one adb command, in seconds
    #[arg(long, default_value = "10")]
    adb_timeout: u64,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: compact or json
    #[arg(long, env = "GENYMOTION_MCP_LOG_FORMAT", default_value = "compact")]
    log_format: String,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut platform = PlatformConfig::new(self.api_url, ApiToken::new(self.api_token));
        platform.request_timeout = Duration::from_secs(self.http_timeout);
        platform.retry_transient = !self.no_retry;

        Config {
            platform,
            adb: AdbConfig {
                program: self.adb_path,
                command_timeout: Duration::from_secs(self.adb_timeout),
            },
            observability: ObservabilityConfig {
                log_level: self.log_level,
                json_logs: self.log_format.eq_ignore_ascii_case("json"),
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = Cli::parse().into_config();
    genymotion_mcp::observability::init_tracing(&config.observability);

    let platform = match config.validate().and_then(|()| PlatformClient::new(&config.platform)) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(kind = %e.kind(), "{}", e);
            eprintln!("genymotion-mcp: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tools = PlatformTools::new(Arc::new(platform), Arc::new(AdbCli::new(&config.adb)));
    let server = McpServer::new(Dispatcher::new(Arc::new(tools)));

    tracing::info!(
        base_url = %config.platform.base_url,
        adb = %config.adb.program.display(),
        "genymotion-mcp starting on stdio"
    );

    let outcome = tokio::select! {
        res = server.serve_stdio() => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            server.shutdown();
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "stdio transport failed");
            ExitCode::FAILURE
        }
    }
}

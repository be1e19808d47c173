//! `crewmon` command line entry point.
//!
//! Without a subcommand the interactive console is launched. `watch` runs
//! one execution without a terminal UI and reports the outcome through the
//! exit code.

mod watch;

use clap::{Args, Parser, Subcommand};
use cm_core::api::HttpExecutionApi;
use cm_core::config::{apply_api_url_override, load_config, validate, CONFIG_DIR};
use cm_core::stream::ExecutionService;
use cm_core::telemetry::{init_file_logging, init_stderr_logging};
use cm_core::transport::WsConnector;
use cm_protocol::ConsoleConfig;
use cm_tui::{run_app, AppOptions};
use color_eyre::eyre::{eyre, WrapErr};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// crewmon -- watch workflow executions stream live from the backend.
#[derive(Parser)]
#[command(name = "crewmon", version, about)]
struct Cli {
    /// Backend API base URL (overrides config and CREWMON_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory containing `.crewmon/config.toml`.
    #[arg(long, global = true, default_value = ".")]
    config_root: PathBuf,

    /// Write logs to this file instead of the default destination.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive console (default when no subcommand is given).
    Run {
        /// Start this process as soon as the console is up.
        #[arg(long)]
        process: Option<u64>,

        #[command(flatten)]
        vars: VarArgs,
    },

    /// Stream one execution to stdout and exit with its outcome.
    Watch {
        /// Process to execute.
        #[arg(long)]
        process: u64,

        #[command(flatten)]
        vars: VarArgs,

        /// Print every event as a JSON line instead of coloured log lines.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Default)]
struct VarArgs {
    /// Execution variable as key=value (repeatable).
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,
}

impl VarArgs {
    fn into_map(self) -> BTreeMap<String, String> {
        self.vars.into_iter().collect()
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

async fn resolve_config(root: &Path, api_url: Option<String>) -> color_eyre::Result<ConsoleConfig> {
    let config = load_config(root)
        .await
        .wrap_err_with(|| format!("Failed to load configuration from {}", root.display()))?;
    let config = apply_api_url_override(config, api_url);
    validate(&config, &root.join(CONFIG_DIR).join("config.toml"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run {
        process: None,
        vars: VarArgs::default(),
    }) {
        Commands::Run { process, vars } => {
            let log_file = cli.log_file.unwrap_or_else(|| PathBuf::from("crewmon.log"));
            init_file_logging(&log_file, "info")
                .wrap_err_with(|| format!("Failed to open log file {}", log_file.display()))?;

            let config = resolve_config(&cli.config_root, cli.api_url).await?;
            let auto_start = process.map(|id| (id, vars.into_map()));
            run_app(AppOptions { config, auto_start })
                .await
                .map_err(|e| eyre!(e))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Watch {
            process,
            vars,
            json,
        } => {
            match &cli.log_file {
                Some(path) => init_file_logging(path, "info")
                    .wrap_err_with(|| format!("Failed to open log file {}", path.display()))?,
                None => init_stderr_logging("info"),
            }

            let config = resolve_config(&cli.config_root, cli.api_url).await?;
            let api = Arc::new(HttpExecutionApi::from_config(&config));
            let handle = ExecutionService::spawn(&config, api, Arc::new(WsConnector::new()));

            let mut stdout = std::io::stdout();
            let outcome = watch::watch(handle, process, vars.into_map(), json, &mut stdout).await?;
            Ok(ExitCode::from(outcome.exit_code()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults_to_console() {
        let cli = Cli::try_parse_from(["crewmon"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config_root, PathBuf::from("."));
    }

    #[test]
    fn test_run_with_auto_start() {
        let cli = Cli::try_parse_from([
            "crewmon", "run", "--process", "42", "--var", "topic=AI", "--var", "q=a=b",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Run { process, vars }) => {
                assert_eq!(process, Some(42));
                let vars = vars.into_map();
                assert_eq!(vars.get("topic").map(String::as_str), Some("AI"));
                assert_eq!(vars.get("q").map(String::as_str), Some("a=b"));
            }
            _ => panic!("Expected run subcommand"),
        }
    }

    #[test]
    fn test_watch_with_global_flags() {
        let cli = Cli::try_parse_from([
            "crewmon",
            "watch",
            "--process",
            "7",
            "--json",
            "--api-url",
            "http://backend:9000/api/v1",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://backend:9000/api/v1"));
        assert!(matches!(
            cli.command,
            Some(Commands::Watch {
                process: 7,
                json: true,
                ..
            })
        ));
    }

    #[test]
    fn test_watch_requires_process() {
        assert!(Cli::try_parse_from(["crewmon", "watch"]).is_err());
    }

    #[test]
    fn test_bad_variable_is_rejected() {
        assert!(Cli::try_parse_from(["crewmon", "run", "--var", "novalue"]).is_err());
        assert!(parse_var("=x").is_err());
    }
}

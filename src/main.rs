//! Command-line entry point.
//!
//! ```text
//! luftmon_service [run] [--dry-run] [--config PATH]
//! luftmon_service serve [--bind ADDR] [--config PATH]
//! ```
//!
//! `run` is meant for cron (e.g. `10 * * * *`, ten minutes after every full
//! hour). `serve` exposes the HTTP trigger instead.

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use luftmon_service::config::{CONFIG_PATH_VAR, Config};
use luftmon_service::logging::{self, DataSource};
use luftmon_service::{pipeline, trigger};

#[derive(Parser)]
#[command(
    name = "luftmon_service",
    version,
    about = "Air quality report for UBA station 1671, posted to Bluesky on alert"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "PATH", env = CONFIG_PATH_VAR)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Fetch, render and publish once (default)
    Run {
        /// Render and log, but never publish
        #[arg(long)]
        dry_run: bool,
    },
    /// Serve the HTTP trigger
    Serve {
        /// Listen address, overrides [server] bind
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run { dry_run: false });

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let dry_run = matches!(command, Command::Run { dry_run: true });
    let pipeline = match pipeline::live_pipeline(&config) {
        Ok(p) => p.dry_run(dry_run),
        Err(e) => {
            logging::error(DataSource::System, None, &format!("Startup failed: {}", e));
            return ExitCode::FAILURE;
        }
    };

    if let Command::Serve { bind } = command {
        let bind = bind.unwrap_or_else(|| config.server.bind.clone());
        let listener = match TcpListener::bind(&bind) {
            Ok(l) => l,
            Err(e) => {
                let message = format!("Cannot bind {}: {}", bind, e);
                logging::error(DataSource::Trigger, None, &message);
                return ExitCode::FAILURE;
            }
        };
        let io_timeout = config.server.io_timeout();
        return match trigger::serve(listener, || pipeline.run(), io_timeout) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                logging::error(DataSource::Trigger, None, &format!("Server stopped: {}", e));
                ExitCode::FAILURE
            }
        };
    }

    let outcome = pipeline.run();
    if let Some(report) = outcome.report() {
        println!("{}", report.text);
    }

    if outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("luftmon_service").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_is_one_shot_run() {
        let cli = parse(&[]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_serve_with_bind_and_config() {
        let args = ["serve", "--bind", "0.0.0.0:9000", "--config", "/etc/luftmon.toml"];
        let cli = parse(&args).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Serve {
                bind: Some("0.0.0.0:9000".to_string())
            })
        );
        assert_eq!(cli.config, Some(PathBuf::from("/etc/luftmon.toml")));
    }

    #[test]
    fn test_config_before_subcommand() {
        let cli = parse(&["--config", "/etc/luftmon.toml", "run"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/luftmon.toml")));
        assert_eq!(cli.command, Some(Command::Run { dry_run: false }));
    }

    #[test]
    fn test_dry_run_flag() {
        let cli = parse(&["run", "--dry-run"]).unwrap();
        assert_eq!(cli.command, Some(Command::Run { dry_run: true }));
    }

    #[test]
    fn test_missing_flag_value_is_error() {
        assert!(parse(&["--config"]).is_err());
    }

    #[test]
    fn test_unknown_argument_is_error() {
        assert!(parse(&["--verbose"]).is_err());
        assert!(parse(&["serve", "--dry-run"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

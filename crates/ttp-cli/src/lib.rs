//! Operator CLI for TTP daemons.
//!
//! Daemons are addressed through their configuration record: `--json`
//! names the record, whose `listeningPort` locates the daemon's control
//! socket and whose `execPath` names the binary `daemon start` launches.
//! `mqtt publish` is the verb the bus channel's default publish command
//! runs.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8Path;
use clap::Parser;
use ttp_config::{ConfigLoader, JsonConfigLoader, LoadedConfig, ValidationMode, load_node_config};
use ttp_metrics::mqtt::publish_once;
use ttp_metrics::{BusConnectOptions, BusConnector, MqttConnector};

mod cli;
mod errors;
mod lifecycle;
mod transport;

use cli::{Cli, CliCommand, DaemonAction, MqttAction};
use errors::AppError;
pub use lifecycle::LaunchError;

const PUBLISH_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Runs the CLI with `args`, writing results to `stdout` and diagnostics to
/// `stderr`.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_connector(args, stdout, stderr, &MqttConnector)
}

pub(crate) fn run_with_connector<I, W, E>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    connector: &dyn BusConnector,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let rendered = error.render().to_string();
            return if error.use_stderr() {
                let _ = write!(stderr, "{rendered}");
                ExitCode::FAILURE
            } else {
                let _ = write!(stdout, "{rendered}");
                ExitCode::SUCCESS
            };
        }
    };
    match execute(cli, stdout, connector) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "ttp: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(cli: Cli, stdout: &mut W, connector: &dyn BusConnector) -> Result<(), AppError> {
    let node = cli.node.as_deref();
    match cli.command {
        CliCommand::Daemon { action } => match action {
            DaemonAction::Start { target, extra } => {
                let config = load(&target.json, node, ValidationMode::default())?;
                let pid = lifecycle::start(&config.daemon, node, &extra)?;
                writeln!(stdout, "started {} (pid {pid})", config.daemon.name())
                    .map_err(AppError::Output)
            }
            DaemonAction::Stop { target } => {
                let config = load(&target.json, node, ValidationMode::lenient())?;
                let answer = transport::request(config.daemon.listening_port(), "terminate", &[])?;
                let pid = answer.pid.map_or_else(|| "?".to_string(), |pid| pid.to_string());
                writeln!(stdout, "terminate sent to {} (pid {pid})", config.daemon.name())
                    .map_err(AppError::Output)
            }
            DaemonAction::Status { target } => {
                let config = load(&target.json, node, ValidationMode::lenient())?;
                print_answer(stdout, config.daemon.listening_port(), "status", &[])
            }
            DaemonAction::Command {
                target,
                command,
                args,
            } => {
                let config = load(&target.json, node, ValidationMode::lenient())?;
                print_answer(stdout, config.daemon.listening_port(), &command, &args)
            }
        },
        CliCommand::Mqtt {
            action:
                MqttAction::Publish {
                    topic,
                    payload,
                    retain,
                },
        } => {
            let settings = load_node_config(node)?;
            let client_id = format!("ttp-{}-{}", settings.node_name(), std::process::id());
            let options = BusConnectOptions::from_settings(&settings.mqtt, &client_id, PUBLISH_KEEP_ALIVE);
            publish_once(connector, &options, &topic, &payload, retain)?;
            Ok(())
        }
    }
}

fn load(json: &Utf8Path, node: Option<&Utf8Path>, mode: ValidationMode) -> Result<LoadedConfig, AppError> {
    let loader = JsonConfigLoader::new(json)
        .with_node_path(node.map(Utf8Path::to_path_buf))
        .with_mode(mode);
    Ok(loader.load()?)
}

fn print_answer<W: Write>(stdout: &mut W, port: u16, command: &str, args: &[String]) -> Result<(), AppError> {
    let answer = transport::request(port, command, args)?;
    for line in &answer.lines {
        writeln!(stdout, "{line}").map_err(AppError::Output)?;
    }
    Ok(())
}

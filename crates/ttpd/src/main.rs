use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use ttp_config::{
    DEFAULT_LOG_FILTER, JsonConfigLoader, LogFormat, ValidationMode, default_log_format,
};
use ttpd::{DaemonRuntime, InterruptMode, RunOutcome, initialise_telemetry};

/// Runs one TTP daemon until it is terminated or interrupted.
#[derive(Debug, Parser)]
#[command(name = "ttpd", version)]
struct Args {
    /// Daemon configuration record.
    #[arg(long = "json", value_name = "PATH")]
    json: Utf8PathBuf,
    /// Node configuration file.
    #[arg(long = "node", value_name = "PATH")]
    node: Option<Utf8PathBuf>,
    /// Ignore keyboard interrupts.
    #[arg(long = "ignore-int")]
    ignore_int: bool,
    /// Downgrade validation failures to warnings.
    #[arg(long, conflicts_with = "strict")]
    lenient: bool,
    /// Require every configuration field.
    #[arg(long)]
    strict: bool,
    /// Tracing filter expression.
    #[arg(long = "log-filter", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
    /// Log output format.
    #[arg(long = "log-format", default_value_t = default_log_format())]
    log_format: LogFormat,
}

impl Args {
    fn validation_mode(&self) -> ValidationMode {
        ValidationMode {
            strict: self.strict,
            lenient: self.lenient,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(error) = initialise_telemetry(&args.log_filter, args.log_format) {
        eprintln!("ttpd: {error}");
        return ExitCode::FAILURE;
    }

    let loader = JsonConfigLoader::new(args.json.clone())
        .with_node_path(args.node.clone())
        .with_mode(args.validation_mode());
    let interrupt_mode = if args.ignore_int {
        InterruptMode::Ignore
    } else {
        InterruptMode::Abort
    };

    // Failures are already reported through the health reporter.
    let Ok(runtime) = DaemonRuntime::builder(Arc::new(loader))
        .interrupt_mode(interrupt_mode)
        .start()
    else {
        return ExitCode::FAILURE;
    };
    match runtime.run() {
        RunOutcome::Terminated | RunOutcome::Interrupted => ExitCode::SUCCESS,
    }
}

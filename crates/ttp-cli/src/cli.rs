//! Command-line interface definitions for the `ttp` operator tool.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Operator tool for TTP daemons.
#[derive(Parser, Debug)]
#[command(name = "ttp", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Node configuration file; `TTP_NODE_CONFIG` is used when absent.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) node: Option<Utf8PathBuf>,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Controls a daemon through its configuration record.
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Talks to the node's MQTT broker.
    Mqtt {
        #[command(subcommand)]
        action: MqttAction,
    },
}

/// The daemon configuration record an action applies to.
#[derive(Args, Debug, Clone)]
pub(crate) struct DaemonTarget {
    /// Daemon configuration record.
    #[arg(long = "json", value_name = "PATH")]
    pub(crate) json: Utf8PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum DaemonAction {
    /// Launches the daemon detached and reports its pid.
    Start {
        #[command(flatten)]
        target: DaemonTarget,
        /// Extra arguments appended to the daemon command line.
        #[arg(last = true, value_name = "ARG")]
        extra: Vec<String>,
    },
    /// Asks the daemon to terminate gracefully.
    Stop {
        #[command(flatten)]
        target: DaemonTarget,
    },
    /// Prints the daemon's status fields.
    Status {
        #[command(flatten)]
        target: DaemonTarget,
    },
    /// Sends an arbitrary command and prints the answer.
    Command {
        #[command(flatten)]
        target: DaemonTarget,
        /// Command name.
        #[arg(value_name = "COMMAND")]
        command: String,
        /// Command arguments.
        #[arg(
            value_name = "ARG",
            num_args = 0..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        args: Vec<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum MqttAction {
    /// Publishes one message and disconnects.
    Publish {
        #[arg(long)]
        topic: String,
        #[arg(long, allow_hyphen_values = true)]
        payload: String,
        /// Ask the broker to retain the message.
        #[arg(long)]
        retain: bool,
    },
}

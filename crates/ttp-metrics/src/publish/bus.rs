//! Bus channel: publish through an external command.

use std::collections::BTreeMap;
use std::io;
use std::process::{Command, Stdio};

use thiserror::Error;
use ttp_config::ChannelKind;
use ttp_config::defaults::METRIC_PREFIX;

use super::{ChannelPublisher, ChannelSettings, PublishStatus, log_outcome, precheck};
use crate::macros::{shell_quote, substitute};
use crate::metric::Metric;

/// Failure to run the publish command.
#[derive(Debug, Error)]
pub enum CommandFailure {
    #[error("failed to spawn publish command: {0}")]
    Spawn(#[source] io::Error),
    #[error("publish command exited with status {code:?}")]
    Status { code: Option<i32> },
}

/// Runs a fully expanded command line.
pub trait CommandRunner {
    fn run(&self, command_line: &str) -> Result<(), CommandFailure>;
}

/// Runs command lines through `sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandRunner;

impl CommandRunner for ShellCommandRunner {
    fn run(&self, command_line: &str) -> Result<(), CommandFailure> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(CommandFailure::Spawn)?;
        if status.success() {
            Ok(())
        } else {
            Err(CommandFailure::Status {
                code: status.code(),
            })
        }
    }
}

/// Publishes metrics as `(topic, value)` pairs through the configured
/// publish command.
pub struct BusPublisher<'a, R = ShellCommandRunner> {
    settings: &'a ChannelSettings,
    runner: R,
}

impl<'a> BusPublisher<'a, ShellCommandRunner> {
    #[must_use]
    pub fn new(settings: &'a ChannelSettings) -> Self {
        Self::with_runner(settings, ShellCommandRunner)
    }
}

impl<'a, R: CommandRunner> BusPublisher<'a, R> {
    #[must_use]
    pub fn with_runner(settings: &'a ChannelSettings, runner: R) -> Self {
        Self { settings, runner }
    }

    /// Topic `metric` is published under.
    #[must_use]
    pub fn topic(&self, metric: &Metric, name: &str) -> String {
        let mut vars = metric.macros(None);
        vars.insert("NODE".into(), self.settings.node.clone());
        vars.insert("NAME".into(), name.to_string());
        vars.insert("LABEL_VALUES".into(), metric.label_values().replace(',', "/"));
        let topic = substitute(&self.settings.topic_template, &vars);
        topic
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Fully expanded publish command for `metric` on `topic`.
    #[must_use]
    pub fn command_line(&self, metric: &Metric, name: &str, topic: &str) -> String {
        let mut vars: BTreeMap<String, String> = metric
            .macros(None)
            .into_iter()
            .map(|(key, value)| (key, shell_quote(&value)))
            .collect();
        vars.insert("NODE".into(), shell_quote(&self.settings.node));
        vars.insert("NAME".into(), shell_quote(name));
        vars.insert("TOPIC".into(), shell_quote(topic));
        substitute(&self.settings.publish_command, &vars)
    }
}

impl<R: CommandRunner> ChannelPublisher for BusPublisher<'_, R> {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Bus
    }

    fn publish(&self, metric: &Metric, caller_prefix: &str) -> PublishStatus {
        let name = metric.prefixed_name(caller_prefix, METRIC_PREFIX);
        let status = match precheck(self.settings, ChannelKind::Bus, metric, false) {
            Err(status) => status,
            Ok(_) => {
                let topic = self.topic(metric, &name);
                let command = self.command_line(metric, &name, &topic);
                if self.settings.dry_run {
                    tracing::info!(target: super::PUBLISH_TARGET, command, "dry run; publish skipped");
                    PublishStatus::Published
                } else {
                    match self.runner.run(&command) {
                        Ok(()) => PublishStatus::Published,
                        Err(error) => {
                            tracing::warn!(
                                target: super::PUBLISH_TARGET,
                                topic,
                                error = %error,
                                "bus publish command failed"
                            );
                            PublishStatus::CommandError
                        }
                    }
                }
            }
        };
        log_outcome(ChannelKind::Bus, &name, status);
        status
    }
}

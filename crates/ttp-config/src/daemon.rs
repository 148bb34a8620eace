//! Daemon configuration record.
//!
//! The record is read from a JSON file whose basename (without extension)
//! becomes the daemon's canonical name. Every field is optional at the serde
//! level so validation can report all missing fields in one pass.

use std::fs::File;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::capability::{ChannelKind, ChannelSwitches, Enableable, JsonConfigured};
use crate::defaults::{
    HTTPING_INTERVAL, LISTENING_INTERVAL, MESSAGING_INTERVAL, MESSAGING_TIMEOUT, TEXTING_INTERVAL,
};
use crate::interval::ConfigWarning;

/// Raw daemon record as found in the JSON file.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DaemonRecord {
    pub enabled: Option<bool>,
    pub exec_path: Option<Utf8PathBuf>,
    pub listening_port: Option<u16>,
    pub listening_interval: Option<i64>,
    pub messaging_interval: Option<i64>,
    pub messaging_timeout: Option<i64>,
    pub httping_interval: Option<i64>,
    pub texting_interval: Option<i64>,
}

impl DaemonRecord {
    /// Names of the fields that are absent from the record.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            ("enabled", self.enabled.is_some()),
            ("execPath", self.exec_path.is_some()),
            ("listeningPort", self.listening_port.is_some()),
            ("listeningInterval", self.listening_interval.is_some()),
            ("messagingInterval", self.messaging_interval.is_some()),
            ("messagingTimeout", self.messaging_timeout.is_some()),
            ("httpingInterval", self.httping_interval.is_some()),
            ("textingInterval", self.texting_interval.is_some()),
        ];
        present
            .into_iter()
            .filter_map(|(key, is_present)| (!is_present).then_some(key))
            .collect()
    }
}

/// How strictly a record is validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationMode {
    /// Every field of the record must be present.
    pub strict: bool,
    /// Downgrade every validation failure to a warning.
    pub lenient: bool,
}

impl ValidationMode {
    /// Strict validation.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            strict: true,
            lenient: false,
        }
    }

    /// Lenient (dry-run) validation.
    #[must_use]
    pub const fn lenient() -> Self {
        Self {
            strict: false,
            lenient: true,
        }
    }
}

/// Validated daemon configuration with effective intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    path: Utf8PathBuf,
    name: String,
    enabled: bool,
    exec_path: Utf8PathBuf,
    listening_port: u16,
    listening_interval: i64,
    messaging_interval: i64,
    messaging_timeout: i64,
    httping_interval: i64,
    texting_interval: i64,
    warnings: Vec<ConfigWarning>,
}

impl DaemonConfig {
    /// Validates a raw record read from `path`.
    ///
    /// Returns the accepted configuration, or the accumulated list of
    /// validation failures when the record is rejected.
    pub fn from_record(
        path: &Utf8Path,
        record: DaemonRecord,
        mode: ValidationMode,
    ) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if record.listening_port.is_none() {
            errors.push("listeningPort is mandatory".to_string());
        }
        match record.exec_path.as_deref() {
            None => errors.push("execPath is mandatory".to_string()),
            Some(exec) => {
                if let Err(error) = File::open(exec.as_std_path()) {
                    errors.push(format!("execPath '{exec}' is not readable: {error}"));
                }
            }
        }
        if record.enabled == Some(false) {
            errors.push("daemon is disabled".to_string());
        }
        if mode.strict {
            for key in record.missing_fields() {
                let message = format!("{key} is mandatory in strict mode");
                if !errors.contains(&message) {
                    errors.push(message);
                }
            }
        }

        if !errors.is_empty() {
            if !mode.lenient {
                return Err(errors);
            }
            warnings.extend(
                errors
                    .into_iter()
                    .map(|message| ConfigWarning::Downgraded { message }),
            );
        }

        let mut resolve = |rule: crate::IntervalRule, value: Option<i64>| {
            let (effective, warning) = rule.resolve(value);
            warnings.extend(warning);
            effective
        };
        let listening_interval = resolve(LISTENING_INTERVAL, record.listening_interval);
        let messaging_interval = resolve(MESSAGING_INTERVAL, record.messaging_interval);
        let messaging_timeout = resolve(MESSAGING_TIMEOUT, record.messaging_timeout);
        let httping_interval = resolve(HTTPING_INTERVAL, record.httping_interval);
        let texting_interval = resolve(TEXTING_INTERVAL, record.texting_interval);

        Ok(Self {
            path: path.to_path_buf(),
            name: daemon_name(path),
            enabled: record.enabled.unwrap_or(true),
            exec_path: record.exec_path.unwrap_or_default(),
            listening_port: record.listening_port.unwrap_or_default(),
            listening_interval,
            messaging_interval,
            messaging_timeout,
            httping_interval,
            texting_interval,
            warnings,
        })
    }

    /// Canonical daemon name derived from the config file basename.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the worker executable.
    #[must_use]
    pub fn exec_path(&self) -> &Utf8Path {
        &self.exec_path
    }

    /// TCP port the control protocol listens on.
    #[must_use]
    pub fn listening_port(&self) -> u16 {
        self.listening_port
    }

    /// Accept loop cadence in milliseconds.
    #[must_use]
    pub fn listening_interval(&self) -> i64 {
        self.listening_interval
    }

    /// Bus advertising cadence in milliseconds; non-positive when disabled.
    #[must_use]
    pub fn messaging_interval(&self) -> i64 {
        self.messaging_interval
    }

    /// Bus keep-alive in seconds.
    #[must_use]
    pub fn messaging_timeout(&self) -> i64 {
        self.messaging_timeout
    }

    /// Push-gateway advertising cadence in milliseconds.
    #[must_use]
    pub fn httping_interval(&self) -> i64 {
        self.httping_interval
    }

    /// Text-file advertising cadence in milliseconds.
    #[must_use]
    pub fn texting_interval(&self) -> i64 {
        self.texting_interval
    }

    /// Advertising cadence of `kind` in milliseconds.
    #[must_use]
    pub fn channel_interval(&self, kind: ChannelKind) -> i64 {
        match kind {
            ChannelKind::Bus => self.messaging_interval,
            ChannelKind::PushGateway => self.httping_interval,
            ChannelKind::TextFile => self.texting_interval,
        }
    }

    /// Returns whether the daemon advertises on `kind`.
    #[must_use]
    pub fn channel_enabled(&self, kind: ChannelKind) -> bool {
        let rule = match kind {
            ChannelKind::Bus => MESSAGING_INTERVAL,
            ChannelKind::PushGateway => HTTPING_INTERVAL,
            ChannelKind::TextFile => TEXTING_INTERVAL,
        };
        rule.enables(self.channel_interval(kind))
    }

    /// Channel switches derived from the advertising intervals.
    #[must_use]
    pub fn channel_switches(&self) -> ChannelSwitches {
        ChannelSwitches {
            bus: self.channel_enabled(ChannelKind::Bus),
            push_gateway: self.channel_enabled(ChannelKind::PushGateway),
            text_file: self.channel_enabled(ChannelKind::TextFile),
        }
    }

    /// Findings recorded while the record was accepted.
    #[must_use]
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Status fields advertised for this configuration, keyed by their
    /// published names.
    #[must_use]
    pub fn status_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("enabled", self.enabled.to_string()),
            ("execPath", self.exec_path.to_string()),
            ("httpingInterval", self.httping_interval.to_string()),
            ("json", self.path.to_string()),
            ("listeningInterval", self.listening_interval.to_string()),
            ("listeningPort", self.listening_port.to_string()),
            ("messagingInterval", self.messaging_interval.to_string()),
            ("messagingTimeout", self.messaging_timeout.to_string()),
            ("textingInterval", self.texting_interval.to_string()),
        ]
    }
}

impl Enableable for DaemonConfig {
    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl JsonConfigured for DaemonConfig {
    fn json_path(&self) -> &Utf8Path {
        &self.path
    }
}

fn daemon_name(path: &Utf8Path) -> String {
    path.file_stem()
        .map(str::to_string)
        .unwrap_or_else(|| path.to_string())
}

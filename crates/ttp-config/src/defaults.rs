use crate::interval::IntervalRule;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Name prefix every published metric carries.
pub const METRIC_PREFIX: &str = "ttp_";

/// Topic template used by the bus channel when none is configured.
pub const DEFAULT_TOPIC_TEMPLATE: &str = "<NODE>/telemetry/<LABEL_VALUES>/<NAME>";

/// Command template used by the bus channel when none is configured.
pub const DEFAULT_PUBLISH_COMMAND: &str = "ttp mqtt publish --topic <TOPIC> --payload <VALUE>";

/// Default MQTT broker port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Environment variable naming the node configuration file.
pub const NODE_CONFIG_ENV_VAR: &str = "TTP_NODE_CONFIG";

/// Accept loop cadence, in milliseconds.
pub const LISTENING_INTERVAL: IntervalRule = IntervalRule {
    key: "listeningInterval",
    default: 1_000,
    floor: 500,
    disables_at_zero: false,
};

/// Bus advertising cadence, in milliseconds; zero or negative disables it.
pub const MESSAGING_INTERVAL: IntervalRule = IntervalRule {
    key: "messagingInterval",
    default: 60_000,
    floor: 5_000,
    disables_at_zero: true,
};

/// Bus keep-alive, in seconds.
pub const MESSAGING_TIMEOUT: IntervalRule = IntervalRule {
    key: "messagingTimeout",
    default: 60,
    floor: 5,
    disables_at_zero: false,
};

/// Push-gateway advertising cadence, in milliseconds.
pub const HTTPING_INTERVAL: IntervalRule = IntervalRule {
    key: "httpingInterval",
    default: 60_000,
    floor: 5_000,
    disables_at_zero: true,
};

/// Text-file advertising cadence, in milliseconds.
pub const TEXTING_INTERVAL: IntervalRule = IntervalRule {
    key: "textingInterval",
    default: 60_000,
    floor: 5_000,
    disables_at_zero: true,
};

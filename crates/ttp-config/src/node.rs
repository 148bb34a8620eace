//! Node-level settings consumed from the site configuration.
//!
//! Only the surface the daemon runtime needs is modelled here: the node
//! name, the MQTT broker, and the telemetry channel settings.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::defaults::{DEFAULT_MQTT_PORT, DEFAULT_PUBLISH_COMMAND, DEFAULT_TOPIC_TEMPLATE};

/// Settings of the node the daemon runs on.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    /// Node name; the host name is used when absent.
    pub node: Option<String>,
    /// MQTT broker the bus channel connects to.
    pub mqtt: MqttSettings,
    /// Telemetry channel settings.
    pub telemetry: TelemetrySettings,
}

impl NodeConfig {
    /// Resolves the node name, falling back to the host name.
    #[must_use]
    pub fn node_name(&self) -> String {
        self.node.clone().unwrap_or_else(host_name)
    }
}

/// Broker connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct MqttSettings {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_MQTT_PORT,
            username: None,
            password: None,
            client_id: None,
        }
    }
}

/// Settings shared by the three telemetry channels.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetrySettings {
    /// Bus topic template.
    pub topic_template: String,
    /// Bus publish command template.
    pub publish_command: String,
    /// Skip network and file side effects, reporting success.
    pub dry_run: bool,
    pub pushgateway: PushGatewaySettings,
    pub textfile: TextFileSettings,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            topic_template: DEFAULT_TOPIC_TEMPLATE.to_string(),
            publish_command: DEFAULT_PUBLISH_COMMAND.to_string(),
            dry_run: false,
            pushgateway: PushGatewaySettings::default(),
            textfile: TextFileSettings::default(),
        }
    }
}

/// Push-gateway endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PushGatewaySettings {
    pub url: Option<Url>,
}

/// Text-file collector drop directory.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TextFileSettings {
    pub drop_dir: Option<Utf8PathBuf>,
}

#[cfg(unix)]
fn host_name() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .map(|name| name.split('.').next().unwrap_or_default().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(not(unix))]
fn host_name() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let node: NodeConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(node.mqtt.port, DEFAULT_MQTT_PORT);
        assert_eq!(node.telemetry.topic_template, DEFAULT_TOPIC_TEMPLATE);
        assert!(node.telemetry.pushgateway.url.is_none());
    }

    #[test]
    fn parses_channel_settings() {
        let node: NodeConfig = serde_json::from_str(
            r#"{
                "node": "NS230134",
                "mqtt": { "host": "broker.local", "port": 8883 },
                "telemetry": {
                    "dryRun": true,
                    "pushgateway": { "url": "http://gateway:9091/metrics/job/ttp" },
                    "textfile": { "dropDir": "/var/lib/node_exporter" }
                }
            }"#,
        )
        .expect("parse");
        assert_eq!(node.node_name(), "NS230134");
        assert_eq!(node.mqtt.host.as_deref(), Some("broker.local"));
        assert!(node.telemetry.dry_run);
        assert_eq!(
            node.telemetry.textfile.drop_dir.as_deref().map(|p| p.as_str()),
            Some("/var/lib/node_exporter")
        );
    }

    #[test]
    fn node_name_falls_back_to_host() {
        let node = NodeConfig::default();
        assert!(!node.node_name().is_empty());
    }
}

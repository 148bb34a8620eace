//! MQTT bus connection.
//!
//! The runtime owns exactly one [`BusClient`]; connecting goes through a
//! [`BusConnector`] so tests can count connection attempts without a broker.

use std::time::{Duration, Instant};

use rumqttc::{Client, Connection, ConnectReturnCode, Event, LastWill, MqttOptions, Packet, QoS};
use thiserror::Error;
use tracing::{debug, info, warn};
use ttp_config::MqttSettings;

const BUS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bus");
const REQUEST_CAPACITY: usize = 64;
const QUEUE_DRAIN_BUDGET: Duration = Duration::from_millis(100);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_BROKER_HOST: &str = "localhost";

/// Errors raised by the bus connection.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to connect to broker {host}:{port}: {message}")]
    Connect {
        host: String,
        port: u16,
        message: String,
    },
    #[error("failed to publish to '{topic}': {message}")]
    Publish { topic: String, message: String },
    #[error("failed to disconnect from broker: {message}")]
    Disconnect { message: String },
}

/// Message the broker delivers when the connection drops unexpectedly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusLastWill {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

/// Parameters of one broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConnectOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
    pub last_will: Option<BusLastWill>,
}

impl BusConnectOptions {
    /// Builds options from node settings; `client_id` is used when the
    /// settings do not name one.
    #[must_use]
    pub fn from_settings(settings: &MqttSettings, client_id: &str, keep_alive: Duration) -> Self {
        Self {
            host: settings
                .host
                .clone()
                .unwrap_or_else(|| DEFAULT_BROKER_HOST.to_string()),
            port: settings.port,
            client_id: settings
                .client_id
                .clone()
                .unwrap_or_else(|| client_id.to_string()),
            username: settings.username.clone(),
            password: settings.password.clone(),
            keep_alive,
            last_will: None,
        }
    }

    #[must_use]
    pub fn with_last_will(mut self, last_will: BusLastWill) -> Self {
        self.last_will = Some(last_will);
        self
    }
}

/// An open bus connection.
pub trait BusClient {
    /// Queues `payload` on `topic`.
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), BusError>;

    /// Drives network I/O (acks, keep-alive pings) for at most `budget`.
    fn service(&mut self, budget: Duration);

    /// Flushes outstanding messages and closes the connection cleanly, so
    /// the broker does not deliver the last will.
    fn disconnect(&mut self) -> Result<(), BusError>;
}

/// Opens bus connections.
pub trait BusConnector {
    fn connect(&self, options: &BusConnectOptions) -> Result<Box<dyn BusClient>, BusError>;
}

/// [`BusConnector`] backed by `rumqttc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MqttConnector;

impl BusConnector for MqttConnector {
    fn connect(&self, options: &BusConnectOptions) -> Result<Box<dyn BusClient>, BusError> {
        let mut mqtt = MqttOptions::new(&options.client_id, &options.host, options.port);
        mqtt.set_keep_alive(options.keep_alive);
        if let (Some(username), Some(password)) = (&options.username, &options.password) {
            mqtt.set_credentials(username, password);
        }
        if let Some(will) = &options.last_will {
            mqtt.set_last_will(LastWill::new(
                &will.topic,
                will.payload.clone(),
                QoS::AtLeastOnce,
                will.retain,
            ));
        }
        let (client, mut connection) = Client::new(mqtt, REQUEST_CAPACITY);
        await_connack(&mut connection, options)?;
        info!(
            target: BUS_TARGET,
            host = %options.host,
            port = options.port,
            client_id = %options.client_id,
            "bus connected"
        );
        Ok(Box::new(MqttBus { client, connection }))
    }
}

fn await_connack(connection: &mut Connection, options: &BusConnectOptions) -> Result<(), BusError> {
    let failure = |message: String| BusError::Connect {
        host: options.host.clone(),
        port: options.port,
        message,
    };
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(failure("timed out waiting for acknowledgement".into()));
        }
        match connection.recv_timeout(remaining) {
            Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                return if ack.code == ConnectReturnCode::Success {
                    Ok(())
                } else {
                    Err(failure(format!("broker refused connection: {:?}", ack.code)))
                };
            }
            Ok(Ok(_)) => {}
            Ok(Err(error)) => return Err(failure(error.to_string())),
            Err(_) => return Err(failure("timed out waiting for acknowledgement".into())),
        }
    }
}

/// Connection produced by [`MqttConnector`].
pub struct MqttBus {
    client: Client,
    connection: Connection,
}

impl BusClient for MqttBus {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), BusError> {
        let queued = self
            .client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec());
        if queued.is_ok() {
            return Ok(());
        }
        // Request queue full: drain it once and retry.
        self.service(QUEUE_DRAIN_BUDGET);
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec())
            .map_err(|error| BusError::Publish {
                topic: topic.to_string(),
                message: error.to_string(),
            })
    }

    fn service(&mut self, budget: Duration) {
        let deadline = Instant::now() + budget;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.connection.recv_timeout(remaining) {
                Ok(Ok(event)) => debug!(target: BUS_TARGET, ?event, "bus event"),
                Ok(Err(error)) => {
                    warn!(target: BUS_TARGET, error = %error, "bus connection error");
                    break;
                }
                Err(_) => break,
            }
        }
    }

    fn disconnect(&mut self) -> Result<(), BusError> {
        self.service(Duration::from_millis(200));
        self.client.disconnect().map_err(|error| BusError::Disconnect {
            message: error.to_string(),
        })?;
        self.service(Duration::from_millis(200));
        info!(target: BUS_TARGET, "bus disconnected");
        Ok(())
    }
}

/// Publishes a single message and disconnects.
pub fn publish_once(
    connector: &dyn BusConnector,
    options: &BusConnectOptions,
    topic: &str,
    payload: &str,
    retain: bool,
) -> Result<(), BusError> {
    let mut client = connector.connect(options)?;
    client.publish(topic, payload, retain)?;
    client.disconnect()
}

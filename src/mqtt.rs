//! MQTT client for remote parameter changes
//!
//! Connects to an MQTT broker and subscribes to a topic. Each message is
//! either JSON (`{"name": "strength", "value": 0.4}`) or a plain command
//! line, and is forwarded to the main loop as a [`Command`].

use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crate::command::{parse_payload, Command, CommandSource};
use crate::control::ControlError;

pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "pixelsmear/params";
const CLIENT_ID: &str = "pixelsmear";

/// MQTT client that receives commands in a background thread
pub struct MqttClient {
    receiver: Receiver<Command>,
    _thread: thread::JoinHandle<()>,
}

impl MqttClient {
    /// Create a new MQTT client and connect to the broker.
    /// Fails immediately if connection cannot be established.
    pub fn new(host: &str, port: u16, topic: &str) -> Result<Self, ControlError> {
        let topic = if topic.is_empty() { DEFAULT_TOPIC } else { topic };

        let mut options = MqttOptions::new(CLIENT_ID, host, port);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut connection) = Client::new(options, 10);

        client.subscribe(topic, QoS::AtMostOnce).map_err(|e| {
            ControlError::Mqtt(format!("Failed to subscribe to topic '{}': {}", topic, e))
        })?;

        // Test connection by polling once - fail fast if broker unreachable
        match connection.iter().next() {
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                return Err(ControlError::Mqtt(format!(
                    "Failed to connect to broker at {}:{} - {}",
                    host, port, e
                )));
            }
            None => {
                return Err(ControlError::Mqtt(format!(
                    "Failed to connect to broker at {}:{} - connection closed",
                    host, port
                )));
            }
        }

        let (sender, receiver) = mpsc::channel();
        let topic_owned = topic.to_string();

        let handle = thread::spawn(move || {
            // The client handle must outlive the event loop
            let _client = client;
            Self::message_loop(connection, &sender, &topic_owned);
        });

        tracing::info!(host, port, topic, "MQTT connected");

        Ok(Self {
            receiver,
            _thread: handle,
        })
    }

    fn message_loop(mut connection: rumqttc::Connection, sender: &Sender<Command>, topic: &str) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if publish.topic != topic {
                        continue;
                    }
                    let Ok(text) = std::str::from_utf8(&publish.payload) else {
                        tracing::warn!(topic, "Ignoring non-UTF-8 MQTT payload");
                        continue;
                    };
                    match parse_payload(text) {
                        Some(cmd) => {
                            tracing::debug!(command = ?cmd, "MQTT command");
                            if sender.send(cmd).is_err() {
                                // Main thread gone, exit
                                break;
                            }
                        }
                        None => tracing::warn!(payload = %text.trim(), "Unknown MQTT command"),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "MQTT connection error");
                    // Keep polling: rumqttc reconnects on the next iteration
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }
    }
}

impl CommandSource for MqttClient {
    fn poll(&mut self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }
}

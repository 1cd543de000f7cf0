//! # Configuration Management
//!
//! Loads relay settings from several sources, highest priority first:
//! 1. Environment variables (`AMR_RELAY_DESTINATION__HOST`, `AMR_RELAY_FRAMING__POLL_INTERVAL_MS`, ...)
//!    plus the `DEST_HOST` / `DEST_PORT` shortcuts
//! 2. Configuration file (`amr-relay.toml`, optional)
//! 3. Default values (the `Default` impl below)
//!
//! Nested keys use a double underscore so that field names containing a
//! single underscore (`frames_per_batch`) survive the environment mapping.

use crate::amr::frame::MAX_ENCODED_FRAME_LEN;
use crate::error::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Complete relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    pub destination: DestinationConfig,
    pub framing: FramingConfig,
    pub source: SourceConfig,
}

/// Where batches are sent.
///
/// ## Fields:
/// - `host`: receiver host name or IP address, resolved on first send
/// - `port`: receiver UDP port
/// - `bind_addr`: local address for the outgoing socket (`0.0.0.0:0` lets the OS pick a port)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DestinationConfig {
    pub host: String,
    pub port: u16,
    pub bind_addr: String,
}

/// How frames are grouped into datagrams and how long to wait for the encoder.
///
/// ## Sizing:
/// `buffer_capacity` must hold `frames_per_batch` frames of the largest mode
/// (1 mode byte + 31 payload bytes), so 10 frames need at least 320 bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FramingConfig {
    pub frames_per_batch: usize,
    pub buffer_capacity: usize,
    pub poll_interval_ms: u64,
}

/// The file the encoder writes into, used by the `amr-relay` binary.
///
/// With `follow = true` reaching the end of the file means "the encoder has
/// not written more yet"; otherwise it ends the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub follow: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            destination: DestinationConfig {
                host: "127.0.0.1".to_string(),
                port: 5656,                         // receiver default
                bind_addr: "0.0.0.0:0".to_string(), // any interface, ephemeral port
            },
            framing: FramingConfig::default(),
            source: SourceConfig {
                path: PathBuf::from("recording.amr"),
                follow: true, // the encoder is still writing
            },
        }
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            frames_per_batch: 10,   // one datagram every 200ms of speech
            buffer_capacity: 1024,  // fits 10 frames of up to 32 bytes
            poll_interval_ms: 100,  // wait between empty reads
        }
    }
}

impl FramingConfig {
    /// Interval slept between polls of an empty source.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Smallest buffer able to hold a full batch of maximum-size frames.
    pub fn required_capacity(&self) -> usize {
        self.frames_per_batch * MAX_ENCODED_FRAME_LEN
    }

    /// Check that a batch can never overflow its buffer.
    pub fn validate(&self) -> RelayResult<()> {
        if self.frames_per_batch == 0 {
            return Err(RelayError::Config(
                "frames_per_batch must be greater than 0".to_string(),
            ));
        }

        if self.buffer_capacity < self.required_capacity() {
            return Err(RelayError::Config(format!(
                "buffer_capacity {} is too small for {} frames (need at least {})",
                self.buffer_capacity,
                self.frames_per_batch,
                self.required_capacity()
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(RelayError::Config(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl RelayConfig {
    /// Load configuration from defaults, `amr-relay.toml` and the environment.
    ///
    /// ## Environment Variable Examples:
    /// - `AMR_RELAY_DESTINATION__HOST=10.0.0.5`
    /// - `AMR_RELAY_FRAMING__FRAMES_PER_BATCH=5`
    /// - `AMR_RELAY_SOURCE__FOLLOW=false`
    /// - `DEST_HOST` / `DEST_PORT`: shortcuts for the destination
    pub fn load() -> anyhow::Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&RelayConfig::default())?)
            .add_source(config::File::with_name("amr-relay").required(false))
            .add_source(
                config::Environment::with_prefix("AMR_RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(host) = env::var("DEST_HOST") {
            settings = settings.set_override("destination.host", host)?;
        }

        if let Ok(port) = env::var("DEST_PORT") {
            settings = settings.set_override("destination.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration makes sense before a session starts.
    pub fn validate(&self) -> RelayResult<()> {
        if self.destination.host.trim().is_empty() {
            return Err(RelayError::Config("destination host cannot be empty".to_string()));
        }

        if self.destination.port == 0 {
            return Err(RelayError::Config("destination port cannot be 0".to_string()));
        }

        self.framing.validate()
    }
}

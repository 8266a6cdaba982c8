//! Runtime configuration
//!
//! Plain serde structs with defaults; every section validates itself and
//! `MurmurConfig` loads the whole tree from TOML. Durations are written as
//! milliseconds (`retry_delay_ms = 100`).

pub mod validation;

pub use validation::{ConfigValidator, ValidationError};

use crate::MurmurError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Socket and send-queue settings shared by every endpoint variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Local address to bind
    pub bind_ip: IpAddr,
    /// First port to try; binding scans upward from here
    pub port: u16,
    /// Number of consecutive ports tried before giving up
    pub port_scan_limit: u16,
    /// Kernel receive buffer size (`SO_RCVBUF`)
    pub receive_buffer_size: usize,
    /// Largest datagram accepted on receive
    pub max_datagram_size: usize,
    /// Delay before a backpressured send queue is retried
    #[serde(rename = "sendqueue_retry_delay_ms", with = "duration_ms")]
    pub sendqueue_retry_delay: Duration,
    /// Capacity of the channel from the I/O task to the processing task
    pub inbound_queue_capacity: usize,
    /// Stop sending to the remaining candidates of a `send` call after the
    /// first non-backpressure error
    pub abort_on_send_error: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 6421,
            port_scan_limit: 1000,
            receive_buffer_size: 870_400,
            max_datagram_size: 65_535,
            sendqueue_retry_delay: Duration::from_millis(100),
            inbound_queue_capacity: 1024,
            abort_on_send_error: false,
        }
    }
}

impl EndpointConfig {
    /// Validate the endpoint section
    pub fn validate(&self) -> Result<(), MurmurError> {
        let mut v = ConfigValidator::new("endpoint");
        v.positive("port_scan_limit", u64::from(self.port_scan_limit))
            .positive("receive_buffer_size", self.receive_buffer_size as u64)
            .range("max_datagram_size", self.max_datagram_size as u64, 1, 65_535)
            .non_zero_duration("sendqueue_retry_delay_ms", self.sendqueue_retry_delay)
            .positive("inbound_queue_capacity", self.inbound_queue_capacity as u64);
        v.finish()
    }
}

/// How long each kind of suspended message waits for its dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionConfig {
    /// Missing signer identity
    #[serde(rename = "missing_member_timeout_ms", with = "duration_ms")]
    pub missing_member_timeout: Duration,
    /// Missing last-N messages of a member
    #[serde(rename = "missing_last_message_timeout_ms", with = "duration_ms")]
    pub missing_last_message_timeout: Duration,
    /// Missing message at a specific global time
    #[serde(rename = "missing_message_timeout_ms", with = "duration_ms")]
    pub missing_message_timeout: Duration,
    /// Missing authorization proof
    #[serde(rename = "missing_proof_timeout_ms", with = "duration_ms")]
    pub missing_proof_timeout: Duration,
    /// Missing sequence-number range
    #[serde(rename = "missing_sequence_timeout_ms", with = "duration_ms")]
    pub missing_sequence_timeout: Duration,
    /// Missing subjective-set membership data
    #[serde(rename = "missing_subjective_set_timeout_ms", with = "duration_ms")]
    pub missing_subjective_set_timeout: Duration,
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            missing_member_timeout: Duration::from_secs(10),
            missing_last_message_timeout: Duration::from_secs(10),
            missing_message_timeout: Duration::from_secs(10),
            missing_proof_timeout: Duration::from_secs(20),
            missing_sequence_timeout: Duration::from_secs(20),
            missing_subjective_set_timeout: Duration::from_secs(20),
        }
    }
}

impl SuspensionConfig {
    /// Validate the suspension section
    pub fn validate(&self) -> Result<(), MurmurError> {
        let mut v = ConfigValidator::new("suspension");
        v.non_zero_duration("missing_member_timeout_ms", self.missing_member_timeout)
            .non_zero_duration(
                "missing_last_message_timeout_ms",
                self.missing_last_message_timeout,
            )
            .non_zero_duration("missing_message_timeout_ms", self.missing_message_timeout)
            .non_zero_duration("missing_proof_timeout_ms", self.missing_proof_timeout)
            .non_zero_duration("missing_sequence_timeout_ms", self.missing_sequence_timeout)
            .non_zero_duration(
                "missing_subjective_set_timeout_ms",
                self.missing_subjective_set_timeout,
            );
        v.finish()
    }
}

/// Cooperative scheduler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Tasks run back to back before the loop yields to the runtime
    pub max_tasks_per_tick: usize,
    /// Tasks running longer than this are logged
    #[serde(rename = "slow_task_warning_ms", with = "duration_ms")]
    pub slow_task_warning: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_tick: 256,
            slow_task_warning: Duration::from_secs(1),
        }
    }
}

impl SchedulerConfig {
    /// Validate the scheduler section
    pub fn validate(&self) -> Result<(), MurmurError> {
        let mut v = ConfigValidator::new("scheduler");
        v.positive("max_tasks_per_tick", self.max_tasks_per_tick as u64)
            .non_zero_duration("slow_task_warning_ms", self.slow_task_warning);
        v.finish()
    }
}

/// Complete Murmur configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    /// Transport settings
    pub endpoint: EndpointConfig,
    /// Delay timeouts
    pub suspension: SuspensionConfig,
    /// Scheduler settings
    pub scheduler: SchedulerConfig,
}

impl MurmurConfig {
    /// Parse and validate a TOML document; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, MurmurError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, MurmurError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MurmurError::invalid(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Self::from_toml_str(&content)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), MurmurError> {
        self.endpoint.validate()?;
        self.suspension.validate()?;
        self.scheduler.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(MurmurConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MurmurConfig::from_toml_str(
            r#"
            [endpoint]
            port = 7000
            sendqueue_retry_delay_ms = 250

            [suspension]
            missing_proof_timeout_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint.port, 7000);
        assert_eq!(config.endpoint.sendqueue_retry_delay, Duration::from_millis(250));
        assert_eq!(config.endpoint.receive_buffer_size, 870_400);
        assert_eq!(config.suspension.missing_proof_timeout, Duration::from_secs(5));
        assert_eq!(config.suspension.missing_member_timeout, Duration::from_secs(10));
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_invalid_values_are_reported_with_field_path() {
        let err = MurmurConfig::from_toml_str(
            r#"
            [endpoint]
            max_datagram_size = 0
            inbound_queue_capacity = 0
            "#,
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("endpoint.max_datagram_size"));
        assert!(message.contains("endpoint.inbound_queue_capacity"));
    }

    #[test]
    fn test_malformed_toml_is_a_serialization_error() {
        let err = MurmurConfig::from_toml_str("[endpoint\nport = ").unwrap_err();
        assert!(matches!(err, MurmurError::Serialization { .. }));
    }
}

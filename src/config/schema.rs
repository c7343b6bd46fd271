use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub cluster: ClusterConfig,
    /// Instance endpoints; the position in this list is the ordinal
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
    /// Connection pool configuration
    #[serde(default)]
    pub pool: PoolConfig,
    /// Status collection configuration
    #[serde(default)]
    pub status: StatusConfig,
    /// Secrets served by the static secret store
    #[serde(default)]
    pub secrets: Vec<SecretConfig>,
}

impl Config {
    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.name.is_empty() {
            return Err(ConfigError::Invalid("cluster.name must not be empty".into()));
        }
        if self.instances.len() < self.cluster.replicas {
            return Err(ConfigError::Invalid(format!(
                "cluster.replicas is {} but only {} instances are configured",
                self.cluster.replicas,
                self.instances.len()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Cluster
// ============================================================================

/// The managed cluster whose status is collected
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Cluster name (used for log correlation)
    pub name: String,
    /// Namespace holding the cluster's secrets
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Number of instances; ordinals are 0..replicas
    pub replicas: usize,
    /// Secret with intermediate primary options, when relaying from an
    /// external primary
    #[serde(default)]
    pub replication_source_secret_name: Option<String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// One MySQL instance
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    /// Hostname or IP
    pub host: String,
    /// Port number
    #[serde(default = "default_port")]
    pub port: u16,
    /// MySQL username
    pub user: String,
    /// MySQL password
    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    3306
}

impl InstanceConfig {
    /// Get the address string (host:port)
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Pool / Status
// ============================================================================

/// Per-instance connection pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of idle connections kept per instance
    #[serde(default = "default_max_idle")]
    pub max_idle: usize,
    /// Maximum connection age before recycling (milliseconds)
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
    /// Maximum idle time before closing (milliseconds)
    #[serde(default = "default_max_idle_time_ms")]
    pub max_idle_time_ms: u64,
    /// Timeout for connect + handshake (milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_max_idle() -> usize {
    2
}

fn default_max_age_ms() -> u64 {
    3_600_000
}

fn default_max_idle_time_ms() -> u64 {
    300_000
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: default_max_idle(),
            max_age_ms: default_max_age_ms(),
            max_idle_time_ms: default_max_idle_time_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl PoolConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    pub fn max_idle_time(&self) -> Duration {
        Duration::from_millis(self.max_idle_time_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Status collection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// Deadline for one whole collection call (milliseconds)
    #[serde(default = "default_status_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_status_timeout_ms() -> u64 {
    30_000
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_status_timeout_ms(),
        }
    }
}

// ============================================================================
// Secrets
// ============================================================================

/// A secret served by the static secret store
#[derive(Debug, Clone, Deserialize)]
pub struct SecretConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

//! Replication status resolution for a MySQL cluster
//!
//! Collects per-instance replication state, picks the most advanced
//! instance by GTID set and resolves intermediate primary options.

pub mod config;
pub mod pool;
pub mod protocol;
pub mod secret;
pub mod status;

pub use config::{load_config, Config};
pub use pool::PoolManager;
pub use secret::StaticSecretStore;
pub use status::{ClusterStatus, StatusAggregator, StatusError};

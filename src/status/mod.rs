//! Replication status resolution
//!
//! This module provides:
//! - Per-instance status collection (primary, replica, relay log, variables, clone)
//! - Engine-evaluated GTID set comparison
//! - Selection of the most advanced instance as failover candidate
//! - Validation of intermediate primary options from a secret
//! - Cluster-wide aggregation into one snapshot per call

mod access;
mod aggregator;
mod collector;
mod error;
mod gtid;
mod latest;
mod options;
mod types;


pub use access::{InstanceAccess, QueryExecutor, SecretStore};
pub use aggregator::StatusAggregator;
pub use collector::collect_instance_status;
pub use error::{AccessError, OptionError, QueryError, SecretError, StatusError};
pub use gtid::{GtidComparator, GtidRelation};
pub use latest::latest_instance;
pub use options::{resolve_intermediate_primary_options, DEFAULT_PRIMARY_PORT};
pub use types::{
    CloneStateStatus, ClusterStatus, GlobalVariablesStatus, InstanceStatus,
    IntermediatePrimaryOptions, PrimaryStatus, ReplicaStatus,
};

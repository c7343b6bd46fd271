//! Status snapshot types
//!
//! Everything here is rebuilt on every collection call and owned by the
//! caller. Optional sub-statuses are `Option`s: "not a replica" is `None`,
//! a failed query is an error and never shows up here.

use std::fmt;

/// Snapshot of a whole cluster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStatus {
    /// Indexed by instance ordinal
    pub instance_status: Vec<InstanceStatus>,
    /// Ordinal of the most advanced instance
    pub latest: Option<usize>,
    pub intermediate_primary_options: Option<IntermediatePrimaryOptions>,
}

impl ClusterStatus {
    /// Status of the most advanced instance, if one was determined
    pub fn latest_instance(&self) -> Option<&InstanceStatus> {
        self.latest.and_then(|i| self.instance_status.get(i))
    }
}

/// Snapshot of one instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceStatus {
    pub primary_status: Option<PrimaryStatus>,
    pub replica_status: Option<ReplicaStatus>,
    pub all_relay_log_executed: bool,
    pub global_variables_status: GlobalVariablesStatus,
    pub clone_state_status: Option<CloneStateStatus>,
}

impl InstanceStatus {
    /// Executed GTID set as reported by `SHOW MASTER STATUS`
    pub fn executed_gtid_set(&self) -> Option<&str> {
        self.primary_status
            .as_ref()
            .map(|p| p.executed_gtid_set.as_str())
    }
}

/// `SHOW MASTER STATUS`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryStatus {
    pub executed_gtid_set: String,
}

/// `SHOW SLAVE STATUS`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaStatus {
    pub master_host: String,
    pub master_port: u16,
    pub slave_io_running: String,
    pub slave_sql_running: String,
    pub retrieved_gtid_set: String,
    pub executed_gtid_set: String,
    pub last_io_errno: i64,
    pub last_io_error: String,
    pub last_sql_errno: i64,
    pub last_sql_error: String,
}

impl ReplicaStatus {
    /// Both replication threads report `Yes`
    pub fn is_running(&self) -> bool {
        self.slave_io_running == "Yes" && self.slave_sql_running == "Yes"
    }
}

/// Replication-relevant global variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalVariablesStatus {
    pub read_only: bool,
    pub super_read_only: bool,
    pub rpl_semi_sync_master_wait_for_slave_count: u32,
}

/// Row of `performance_schema.clone_status`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneStateStatus {
    pub state: Option<String>,
}

/// Connection options for relaying from a primary outside the cluster
#[derive(Clone, PartialEq, Eq)]
pub struct IntermediatePrimaryOptions {
    pub primary_host: String,
    pub primary_port: u16,
    pub primary_user: Option<String>,
    pub primary_password: Option<String>,
}

impl fmt::Debug for IntermediatePrimaryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntermediatePrimaryOptions")
            .field("primary_host", &self.primary_host)
            .field("primary_port", &self.primary_port)
            .field("primary_user", &self.primary_user)
            .field(
                "primary_password",
                &self.primary_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

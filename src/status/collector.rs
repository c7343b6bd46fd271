//! Per-instance status collection
//!
//! Every statement here is read-only. Failures are tagged with the
//! instance ordinal and returned as-is.

use tracing::debug;

use crate::protocol::{quote_literal, ResultSet};

use super::access::QueryExecutor;
use super::error::{QueryError, StatusError};
use super::types::{
    CloneStateStatus, GlobalVariablesStatus, InstanceStatus, PrimaryStatus, ReplicaStatus,
};

const PRIMARY_STATUS_SQL: &str = "SHOW MASTER STATUS";
const REPLICA_STATUS_SQL: &str = "SHOW SLAVE STATUS";
const GLOBAL_VARIABLES_SQL: &str =
    "SELECT @@read_only, @@super_read_only, @@rpl_semi_sync_master_wait_for_slave_count";
const CLONE_STATE_SQL: &str = "SELECT state FROM performance_schema.clone_status";

/// Collect the status of the instance at `ordinal`
pub async fn collect_instance_status<E>(
    conn: &mut E,
    ordinal: usize,
) -> Result<InstanceStatus, StatusError>
where
    E: QueryExecutor + ?Sized,
{
    let tag = |e| StatusError::query(ordinal, e);

    let primary_status = query_primary_status(conn).await.map_err(tag)?;
    let replica_status = query_replica_status(conn).await.map_err(tag)?;
    let global_variables_status = query_global_variables(conn).await.map_err(tag)?;
    let clone_state_status = query_clone_state(conn).await.map_err(tag)?;

    let all_relay_log_executed = match replica_status {
        Some(ref replica) => relay_log_executed(conn, &replica.retrieved_gtid_set)
            .await
            .map_err(tag)?,
        None => false,
    };

    debug!(
        ordinal = ordinal,
        primary = primary_status.is_some(),
        replica = replica_status.is_some(),
        all_relay_log_executed = all_relay_log_executed,
        read_only = global_variables_status.read_only,
        "Collected instance status"
    );

    Ok(InstanceStatus {
        primary_status,
        replica_status,
        all_relay_log_executed,
        global_variables_status,
        clone_state_status,
    })
}

async fn query_primary_status<E>(conn: &mut E) -> Result<Option<PrimaryStatus>, QueryError>
where
    E: QueryExecutor + ?Sized,
{
    let rs = conn.query(PRIMARY_STATUS_SQL).await?;
    if rs.is_empty() {
        return Ok(None);
    }
    Ok(Some(PrimaryStatus {
        executed_gtid_set: text(&rs, "Executed_Gtid_Set"),
    }))
}

async fn query_replica_status<E>(conn: &mut E) -> Result<Option<ReplicaStatus>, QueryError>
where
    E: QueryExecutor + ?Sized,
{
    let rs = conn.query(REPLICA_STATUS_SQL).await?;
    if rs.is_empty() {
        return Ok(None);
    }
    Ok(Some(ReplicaStatus {
        master_host: text(&rs, "Master_Host"),
        master_port: number(&rs, "Master_Port")?,
        slave_io_running: text(&rs, "Slave_IO_Running"),
        slave_sql_running: text(&rs, "Slave_SQL_Running"),
        retrieved_gtid_set: text(&rs, "Retrieved_Gtid_Set"),
        executed_gtid_set: text(&rs, "Executed_Gtid_Set"),
        last_io_errno: number(&rs, "Last_IO_Errno")?,
        last_io_error: text(&rs, "Last_IO_Error"),
        last_sql_errno: number(&rs, "Last_SQL_Errno")?,
        last_sql_error: text(&rs, "Last_SQL_Error"),
    }))
}

async fn query_global_variables<E>(conn: &mut E) -> Result<GlobalVariablesStatus, QueryError>
where
    E: QueryExecutor + ?Sized,
{
    let rs = conn.query(GLOBAL_VARIABLES_SQL).await?;
    let row = rs
        .first_row()
        .ok_or_else(|| QueryError::Unexpected("global variables returned no rows".into()))?;

    Ok(GlobalVariablesStatus {
        read_only: parse_bool("@@read_only", row.get(0))?,
        super_read_only: parse_bool("@@super_read_only", row.get(1))?,
        rpl_semi_sync_master_wait_for_slave_count: parse_number(
            "@@rpl_semi_sync_master_wait_for_slave_count",
            row.get(2),
        )?,
    })
}

async fn query_clone_state<E>(conn: &mut E) -> Result<Option<CloneStateStatus>, QueryError>
where
    E: QueryExecutor + ?Sized,
{
    let rs = conn.query(CLONE_STATE_SQL).await?;
    Ok(rs.first_row().map(|row| CloneStateStatus {
        state: row.get(0).map(str::to_string),
    }))
}

/// Whether every retrieved transaction is already in `gtid_executed`
async fn relay_log_executed<E>(conn: &mut E, retrieved: &str) -> Result<bool, QueryError>
where
    E: QueryExecutor + ?Sized,
{
    let sql = format!(
        "SELECT GTID_SUBSET({}, @@global.gtid_executed)",
        quote_literal(retrieved)
    );
    let rs = conn.query(&sql).await?;
    let value = rs.first_row().and_then(|row| row.get(0));
    parse_bool("GTID_SUBSET", value)
}

fn text(rs: &ResultSet, column: &str) -> String {
    rs.value(0, column).unwrap_or_default().to_string()
}

fn number<T: std::str::FromStr + Default>(rs: &ResultSet, column: &str) -> Result<T, QueryError> {
    match rs.value(0, column) {
        None | Some("") => Ok(T::default()),
        value => parse_number(column, value),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: Option<&str>) -> Result<T, QueryError> {
    let value = value.ok_or_else(|| QueryError::Unexpected(format!("{} is NULL", name)))?;
    value
        .trim()
        .parse()
        .map_err(|_| QueryError::Unexpected(format!("{} is not a number: {:?}", name, value)))
}

fn parse_bool(name: &str, value: Option<&str>) -> Result<bool, QueryError> {
    match value {
        Some(v) if v == "1" || v.eq_ignore_ascii_case("ON") => Ok(true),
        Some(v) if v == "0" || v.eq_ignore_ascii_case("OFF") => Ok(false),
        Some(other) => Err(QueryError::Unexpected(format!(
            "{} is not a boolean: {:?}",
            name, other
        ))),
        None => Err(QueryError::Unexpected(format!("{} is NULL", name))),
    }
}

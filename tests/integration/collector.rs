//! Instance status collection against a real server

use crate::{get_mysql_config, skip_if_not_enabled, test_pool_config};
use cluster_status::pool::MySqlConnection;
use cluster_status::status::collect_instance_status;
use mysql::prelude::*;

#[tokio::test]
async fn test_collect_matches_server_state() {
    skip_if_not_enabled!();

    let config = get_mysql_config();
    let mut reference = config.conn();
    let mut conn = MySqlConnection::connect(&config.instance(), test_pool_config().connect_timeout())
        .await
        .expect("connect should succeed");

    let status = collect_instance_status(&mut conn, 0)
        .await
        .expect("collection should succeed");

    let gtid_executed: Option<String> = reference
        .query_first("SELECT @@global.gtid_executed")
        .expect("SELECT @@global.gtid_executed should succeed");
    let primary = status
        .primary_status
        .as_ref()
        .expect("binary logging must be enabled");
    // Whitespace differs between SHOW MASTER STATUS and the variable
    assert_eq!(
        primary.executed_gtid_set.replace(['\n', ' '], ""),
        gtid_executed.unwrap_or_default().replace(['\n', ' '], "")
    );

    let (read_only, super_read_only): (i64, i64) = reference
        .query_first("SELECT @@read_only, @@super_read_only")
        .expect("SELECT @@read_only should succeed")
        .expect("one row");
    assert_eq!(status.global_variables_status.read_only, read_only == 1);
    assert_eq!(status.global_variables_status.super_read_only, super_read_only == 1);

    let slave_rows: Vec<mysql::Row> = reference
        .query("SHOW SLAVE STATUS")
        .expect("SHOW SLAVE STATUS should succeed");
    assert_eq!(status.replica_status.is_some(), !slave_rows.is_empty());
    if slave_rows.is_empty() {
        assert!(!status.all_relay_log_executed);
    }
}

#[tokio::test]
async fn test_collect_twice_is_stable() {
    skip_if_not_enabled!();

    let config = get_mysql_config();
    let mut conn = MySqlConnection::connect(&config.instance(), test_pool_config().connect_timeout())
        .await
        .expect("connect should succeed");

    let first = collect_instance_status(&mut conn, 0).await.unwrap();
    let second = collect_instance_status(&mut conn, 0).await.unwrap();
    assert_eq!(
        first.global_variables_status,
        second.global_variables_status
    );
    assert_eq!(first.replica_status.is_some(), second.replica_status.is_some());
}

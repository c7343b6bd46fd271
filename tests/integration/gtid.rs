//! Engine-evaluated GTID comparison against a real server

use crate::{get_mysql_config, skip_if_not_enabled, test_pool_config};
use cluster_status::pool::MySqlConnection;
use cluster_status::status::{GtidComparator, GtidRelation};
use mysql::prelude::*;

const SOURCE_A: &str = "3E11FA47-71CA-11E1-9E33-C80AA9429562";
const SOURCE_B: &str = "4F22AB58-82DB-22F2-AF44-D91BBA53A673";

#[tokio::test]
async fn test_compare_gtid_sets_on_server() {
    skip_if_not_enabled!();

    let config = get_mysql_config();
    let mut conn = MySqlConnection::connect(&config.instance(), test_pool_config().connect_timeout())
        .await
        .expect("connect should succeed");

    let small = format!("{}:1-3", SOURCE_A);
    let large = format!("{}:1-5", SOURCE_A);
    let other = format!("{}:1-5", SOURCE_B);

    assert_eq!(
        conn.compare_gtid_sets(&small, &large).await.unwrap(),
        GtidRelation::Subset
    );
    assert_eq!(
        conn.compare_gtid_sets(&large, &small).await.unwrap(),
        GtidRelation::Superset
    );
    assert_eq!(
        conn.compare_gtid_sets(&large, &other).await.unwrap(),
        GtidRelation::Incomparable
    );
    assert_eq!(
        conn.compare_gtid_sets(&format!("{},{}", large, other), &format!("{},{}", other, large))
            .await
            .unwrap(),
        GtidRelation::Equal
    );
}

#[tokio::test]
async fn test_comparison_matches_reference_client() {
    skip_if_not_enabled!();

    let config = get_mysql_config();
    let mut reference = config.conn();
    let mut conn = MySqlConnection::connect(&config.instance(), test_pool_config().connect_timeout())
        .await
        .expect("connect should succeed");

    let a = format!("{}:1-10:20-30", SOURCE_A);
    let b = format!("{}:1-30", SOURCE_A);

    let a_in_b: Option<i64> = reference
        .exec_first("SELECT GTID_SUBSET(?, ?)", (a.as_str(), b.as_str()))
        .expect("GTID_SUBSET should succeed");
    let b_in_a: Option<i64> = reference
        .exec_first("SELECT GTID_SUBSET(?, ?)", (b.as_str(), a.as_str()))
        .expect("GTID_SUBSET should succeed");

    let expected = match (a_in_b, b_in_a) {
        (Some(1), Some(1)) => GtidRelation::Equal,
        (Some(1), Some(0)) => GtidRelation::Subset,
        (Some(0), Some(1)) => GtidRelation::Superset,
        _ => GtidRelation::Incomparable,
    };
    assert_eq!(conn.compare_gtid_sets(&a, &b).await.unwrap(), expected);
    assert_eq!(expected, GtidRelation::Subset);
}

#[tokio::test]
async fn test_malformed_gtid_set_is_query_error() {
    skip_if_not_enabled!();

    let config = get_mysql_config();
    let mut conn = MySqlConnection::connect(&config.instance(), test_pool_config().connect_timeout())
        .await
        .expect("connect should succeed");

    let result = conn.compare_gtid_sets("not-a-gtid-set", SOURCE_A).await;
    assert!(result.is_err(), "malformed set should fail, got {:?}", result);
}

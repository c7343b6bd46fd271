//! Cluster status aggregation against a real server

use std::collections::BTreeMap;

use crate::{get_mysql_config, skip_if_not_enabled, test_pool_config, unreachable_instance};
use cluster_status::config::{ClusterConfig, StatusConfig};
use cluster_status::status::{AccessError, StatusError};
use cluster_status::{PoolManager, StaticSecretStore, StatusAggregator};
use tokio_util::sync::CancellationToken;

fn cluster(replicas: usize, secret: Option<&str>) -> ClusterConfig {
    ClusterConfig {
        name: "it-cluster".to_string(),
        namespace: "it".to_string(),
        replicas,
        replication_source_secret_name: secret.map(str::to_string),
    }
}

#[tokio::test]
async fn test_single_instance_cluster_status() {
    skip_if_not_enabled!();

    let config = get_mysql_config();
    let manager = PoolManager::new(&[config.instance()], test_pool_config());
    let aggregator = StatusAggregator::new(manager, StaticSecretStore::new(), StatusConfig::default());

    let status = aggregator
        .cluster_status(&cluster(1, None), &CancellationToken::new())
        .await
        .expect("status collection should succeed");

    assert_eq!(status.instance_status.len(), 1);
    assert_eq!(status.latest, Some(0));
    assert!(status.intermediate_primary_options.is_none());

    // Connection went back to the pool
    assert_eq!(aggregator.access().stats().idle_connections, 1);
}

#[tokio::test]
async fn test_intermediate_primary_options_from_secret() {
    skip_if_not_enabled!();

    let config = get_mysql_config();
    let mut secrets = StaticSecretStore::new();
    secrets.insert(
        "it",
        "source",
        BTreeMap::from([
            ("PRIMARY_HOST".to_string(), b"external.example".to_vec()),
            ("PRIMARY_PORT".to_string(), b"3307".to_vec()),
            ("PRIMARY_USER".to_string(), b"repl".to_vec()),
        ]),
    );
    let manager = PoolManager::new(&[config.instance()], test_pool_config());
    let aggregator = StatusAggregator::new(manager, secrets, StatusConfig::default());

    let status = aggregator
        .cluster_status(&cluster(1, Some("source")), &CancellationToken::new())
        .await
        .expect("status collection should succeed");

    let options = status.intermediate_primary_options.expect("options");
    assert_eq!(options.primary_host, "external.example");
    assert_eq!(options.primary_port, 3307);
    assert_eq!(options.primary_user.as_deref(), Some("repl"));
    assert!(options.primary_password.is_none());
}

#[tokio::test]
async fn test_unreachable_instance_fails_whole_call() {
    skip_if_not_enabled!();

    let config = get_mysql_config();
    let manager = PoolManager::new(
        &[config.instance(), unreachable_instance()],
        test_pool_config(),
    );
    let aggregator = StatusAggregator::new(manager, StaticSecretStore::new(), StatusConfig::default());

    let err = aggregator
        .cluster_status(&cluster(2, None), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        StatusError::Connection {
            ordinal: 1,
            source: AccessError::Unreachable(_),
        } => {}
        other => panic!("unexpected error: {:?}", other),
    }
}

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use cluster_status::config::{self, Config};
use cluster_status::{PoolManager, StaticSecretStore, StatusAggregator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = load_config_from_args()?;

    info!(
        cluster = %config.cluster.name,
        namespace = %config.cluster.namespace,
        replicas = config.cluster.replicas,
        timeout_ms = config.status.timeout_ms,
        "Collecting cluster status"
    );

    let pool_manager = PoolManager::new(&config.instances, config.pool.clone());
    let secrets = StaticSecretStore::from(config.secrets.as_slice());
    let aggregator = StatusAggregator::new(pool_manager, secrets, config.status.clone());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling status collection");
            ctrl_c.cancel();
        }
    });

    let result = aggregator.cluster_status(&config.cluster, &cancel).await;
    aggregator.access().close_all().await;
    let status = result.context("cluster status collection failed")?;

    for (ordinal, instance) in status.instance_status.iter().enumerate() {
        info!(
            ordinal,
            executed_gtid_set = instance.executed_gtid_set().unwrap_or(""),
            replica_running = instance.replica_status.as_ref().map(|r| r.is_running()),
            all_relay_log_executed = instance.all_relay_log_executed,
            read_only = instance.global_variables_status.read_only,
            super_read_only = instance.global_variables_status.super_read_only,
            clone_state = ?instance
                .clone_state_status
                .as_ref()
                .and_then(|c| c.state.as_deref()),
            "Instance status"
        );
    }
    info!(
        latest = ?status.latest,
        intermediate_primary = ?status.intermediate_primary_options,
        "Cluster status"
    );

    Ok(())
}

/// Load the config named on the command line, or the first default path
fn load_config_from_args() -> anyhow::Result<Config> {
    if let Some(path) = std::env::args().nth(1) {
        let config = config::load_config(&path)
            .with_context(|| format!("failed to load config from {}", path))?;
        info!(path = %path, "Loaded configuration");
        return Ok(config);
    }

    let config_paths = ["config/cluster-status.toml", "cluster-status.toml"];

    for path in config_paths {
        match config::load_config(path) {
            Ok(config) => {
                info!(path = path, "Loaded configuration");
                return Ok(config);
            }
            Err(e) => {
                warn!(path = path, error = %e, "Failed to load config");
            }
        }
    }

    anyhow::bail!("no configuration found in {:?}", config_paths)
}

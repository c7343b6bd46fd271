//! Cluster-wide status aggregation
//!
//! One call fans out a collector per ordinal, joins them, resolves the
//! latest instance and, when configured, the intermediate primary options.
//! Any failure fails the whole call; there is no partial snapshot.

use std::time::Duration;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{ClusterConfig, StatusConfig};

use super::access::{InstanceAccess, SecretStore};
use super::collector::collect_instance_status;
use super::error::StatusError;
use super::latest::latest_instance;
use super::options::resolve_intermediate_primary_options;
use super::types::{ClusterStatus, InstanceStatus, IntermediatePrimaryOptions};

/// Builds `ClusterStatus` snapshots from live instances
pub struct StatusAggregator<A, S> {
    access: A,
    secrets: S,
    config: StatusConfig,
}

impl<A, S> StatusAggregator<A, S>
where
    A: InstanceAccess,
    S: SecretStore,
{
    pub fn new(access: A, secrets: S, config: StatusConfig) -> Self {
        Self {
            access,
            secrets,
            config,
        }
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    /// Collect a fresh snapshot of `cluster`.
    ///
    /// Returns `Cancelled` if `cancel` fires and `DeadlineExceeded` if the
    /// configured timeout elapses; in-flight queries are dropped either way.
    #[instrument(skip_all, fields(cluster = %cluster.name, namespace = %cluster.namespace))]
    pub async fn cluster_status(
        &self,
        cluster: &ClusterConfig,
        cancel: &CancellationToken,
    ) -> Result<ClusterStatus, StatusError> {
        let deadline = Duration::from_millis(self.config.timeout_ms);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StatusError::Cancelled),
            result = tokio::time::timeout(deadline, self.collect(cluster)) => {
                result.unwrap_or(Err(StatusError::DeadlineExceeded(deadline)))
            }
        };

        match result {
            Ok(ref status) => info!(
                instances = status.instance_status.len(),
                latest = ?status.latest,
                intermediate = status.intermediate_primary_options.is_some(),
                "Collected cluster status"
            ),
            Err(ref e) => warn!(error = %e, ordinal = ?e.ordinal(), "Cluster status collection failed"),
        }
        result
    }

    async fn collect(&self, cluster: &ClusterConfig) -> Result<ClusterStatus, StatusError> {
        let instances = try_join_all((0..cluster.replicas).map(|ordinal| self.collect_one(ordinal)));
        let options = self.intermediate_primary_options(cluster);
        let (instance_status, intermediate_primary_options) = tokio::try_join!(instances, options)?;

        let latest = if instance_status.is_empty() {
            None
        } else {
            let (ordinal, mut conn) = self.comparison_connection(instance_status.len()).await?;
            let latest = latest_instance(&mut conn, &instance_status)
                .await
                .map_err(|e| match e {
                    StatusError::GtidComparison { source } => StatusError::query(ordinal, source),
                    other => other,
                })?;
            Some(latest)
        };

        Ok(ClusterStatus {
            instance_status,
            latest,
            intermediate_primary_options,
        })
    }

    async fn collect_one(&self, ordinal: usize) -> Result<InstanceStatus, StatusError> {
        let mut conn = self
            .access
            .get_connection(ordinal)
            .await
            .map_err(|source| StatusError::Connection { ordinal, source })?;
        collect_instance_status(&mut conn, ordinal).await
    }

    async fn intermediate_primary_options(
        &self,
        cluster: &ClusterConfig,
    ) -> Result<Option<IntermediatePrimaryOptions>, StatusError> {
        match cluster.replication_source_secret_name {
            Some(ref name) => {
                resolve_intermediate_primary_options(&self.secrets, &cluster.namespace, name)
                    .await
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    /// Connection to the first reachable instance. GTID containment does not
    /// depend on which instance evaluates it.
    async fn comparison_connection(
        &self,
        replicas: usize,
    ) -> Result<(usize, A::Conn), StatusError> {
        let mut last_error = None;
        for ordinal in 0..replicas {
            match self.access.get_connection(ordinal).await {
                Ok(conn) => {
                    debug!(ordinal = ordinal, "Comparing GTID sets on instance");
                    return Ok((ordinal, conn));
                }
                Err(source) => {
                    debug!(ordinal = ordinal, error = %source, "Instance unavailable for GTID comparison");
                    last_error = Some(StatusError::Connection { ordinal, source });
                }
            }
        }
        Err(last_error.unwrap_or(StatusError::CannotCompareGtids))
    }
}

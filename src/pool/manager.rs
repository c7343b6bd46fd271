use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{InstanceConfig, PoolConfig};
use crate::status::{AccessError, InstanceAccess};

use super::instance::{InstancePool, PooledConnection};

/// Pool manager holding one pool per instance ordinal
pub struct PoolManager {
    /// Pools indexed by ordinal
    pools: Vec<Arc<InstancePool>>,
}

impl PoolManager {
    /// Create a pool for every configured instance, in ordinal order
    pub fn new(instances: &[InstanceConfig], pool_config: PoolConfig) -> Self {
        let pools = instances
            .iter()
            .map(|instance| Arc::new(InstancePool::new(instance.clone(), pool_config.clone())))
            .collect::<Vec<_>>();
        debug!(instances = pools.len(), "Created instance pools");
        Self { pools }
    }

    /// Pool for an ordinal
    pub fn pool(&self, ordinal: usize) -> Option<&Arc<InstancePool>> {
        self.pools.get(ordinal)
    }

    /// Number of managed instances
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            instances: self.pools.len(),
            idle_connections: self.pools.iter().map(|p| p.idle_count()).sum(),
        }
    }

    /// Close idle connections of every instance
    pub async fn close_all(&self) {
        for pool in &self.pools {
            pool.close_all().await;
        }
    }
}

#[async_trait]
impl InstanceAccess for PoolManager {
    type Conn = PooledConnection;

    async fn get_connection(&self, ordinal: usize) -> Result<Self::Conn, AccessError> {
        let pool = self
            .pools
            .get(ordinal)
            .ok_or(AccessError::UnknownOrdinal(ordinal))?;

        pool.get().await.map_err(|e| {
            warn!(ordinal, addr = %pool.addr(), error = %e, "Instance unreachable");
            AccessError::Unreachable(format!("{}: {}", pool.addr(), e))
        })
    }
}

/// Pool statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub instances: usize,
    pub idle_connections: usize,
}

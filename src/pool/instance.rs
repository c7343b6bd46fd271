use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::{InstanceConfig, PoolConfig};
use crate::protocol::ResultSet;
use crate::status::{QueryError, QueryExecutor};

use super::connection::{ConnectionError, MySqlConnection};

/// Idle connections to one instance
///
/// Connections are leased through [`PooledConnection`] and come back to the
/// idle queue when the lease is dropped.
pub struct InstancePool {
    /// Pool configuration
    config: PoolConfig,
    /// Instance endpoint and credentials
    instance: InstanceConfig,
    /// Idle connections
    idle: Mutex<VecDeque<MySqlConnection>>,
}

impl InstancePool {
    pub fn new(instance: InstanceConfig, config: PoolConfig) -> Self {
        Self {
            config,
            instance,
            idle: Mutex::new(VecDeque::new()),
        }
    }

    /// Lease a connection
    ///
    /// Reuses an idle connection that is still fresh and answers a ping,
    /// otherwise opens a new one.
    pub async fn get(self: &Arc<Self>) -> Result<PooledConnection, ConnectionError> {
        loop {
            // Guard is released before any await below
            let candidate = self.idle.lock().pop_front();
            let Some(mut conn) = candidate else {
                break;
            };

            if conn.is_expired(self.config.max_age()) {
                debug!(addr = %self.addr(), "Connection expired, discarding");
                continue;
            }

            if conn.is_idle_too_long(self.config.max_idle_time()) {
                debug!(addr = %self.addr(), "Connection idle too long, discarding");
                continue;
            }

            if !conn.ping().await {
                warn!(addr = %self.addr(), "Idle connection failed ping, discarding");
                continue;
            }

            debug!(addr = %self.addr(), "Reusing idle connection");
            return Ok(PooledConnection::new(conn, Arc::clone(self)));
        }

        debug!(addr = %self.addr(), "Creating new connection");
        let conn = MySqlConnection::connect(&self.instance, self.config.connect_timeout()).await?;
        Ok(PooledConnection::new(conn, Arc::clone(self)))
    }

    /// Return a connection to the idle queue
    ///
    /// Connections that are mid-command, broken or expired are dropped, as are
    /// connections beyond `max_idle`.
    fn put(&self, conn: MySqlConnection) {
        if !conn.is_usable() {
            debug!(addr = %self.addr(), state = ?conn.state(), "Connection not usable, discarding");
            return;
        }

        if conn.is_expired(self.config.max_age()) {
            debug!(addr = %self.addr(), "Connection expired, discarding");
            return;
        }

        let mut idle = self.idle.lock();
        if idle.len() >= self.config.max_idle {
            debug!(addr = %self.addr(), "Pool full, discarding connection");
            return;
        }

        idle.push_back(conn);
        debug!(addr = %self.addr(), idle_count = idle.len(), "Returned connection to pool");
    }

    /// Get current number of idle connections
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Close all idle connections
    pub async fn close_all(&self) {
        let drained: Vec<_> = self.idle.lock().drain(..).collect();
        for conn in drained {
            conn.quit().await;
        }
        debug!(addr = %self.addr(), "Closed all idle connections");
    }

    /// Instance address (host:port)
    pub fn addr(&self) -> String {
        self.instance.addr()
    }
}

/// A leased connection; goes back to its pool on drop
pub struct PooledConnection {
    conn: Option<MySqlConnection>,
    pool: Arc<InstancePool>,
}

impl PooledConnection {
    fn new(conn: MySqlConnection, pool: Arc<InstancePool>) -> Self {
        Self {
            conn: Some(conn),
            pool,
        }
    }

    pub async fn query(&mut self, sql: &str) -> Result<ResultSet, ConnectionError> {
        match self.conn.as_mut() {
            Some(conn) => conn.query(sql).await,
            None => Err(ConnectionError::Disconnected),
        }
    }

    /// Instance address of the owning pool
    pub fn addr(&self) -> String {
        self.pool.addr()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put(conn);
        }
    }
}

#[async_trait]
impl QueryExecutor for PooledConnection {
    async fn query(&mut self, sql: &str) -> Result<ResultSet, QueryError> {
        PooledConnection::query(self, sql).await.map_err(Into::into)
    }
}

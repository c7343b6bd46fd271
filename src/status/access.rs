//! Collaborator seams used by status collection

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::protocol::ResultSet;

use super::error::{AccessError, QueryError, SecretError};

/// Runs read-only statements on one instance
#[async_trait]
pub trait QueryExecutor: Send {
    async fn query(&mut self, sql: &str) -> Result<ResultSet, QueryError>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for Box<E> {
    async fn query(&mut self, sql: &str) -> Result<ResultSet, QueryError> {
        (**self).query(sql).await
    }
}

/// Hands out authenticated connections by instance ordinal
#[async_trait]
pub trait InstanceAccess: Send + Sync {
    type Conn: QueryExecutor;

    async fn get_connection(&self, ordinal: usize) -> Result<Self::Conn, AccessError>;
}

/// Read-only object store holding secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, SecretError>;
}

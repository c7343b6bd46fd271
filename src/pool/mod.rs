//! Connection pooling for instance introspection
//!
//! One [`InstancePool`] per instance ordinal; [`PoolManager`] hands out
//! leased connections through the `InstanceAccess` seam.

mod connection;
mod instance;
mod manager;

#[cfg(test)]
pub(crate) mod fake_server;

pub use connection::{ConnectionError, ConnectionState, MySqlConnection};
pub use instance::{InstancePool, PooledConnection};
pub use manager::{PoolManager, PoolStats};

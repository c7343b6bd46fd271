//! Integration test entry point
//!
//! Run with: CLUSTER_STATUS_RUN_INTEGRATION_TESTS=1 cargo test --test integration
//!
//! Needs a MySQL 8.0 server with `gtid_mode=ON` and binary logging enabled.
//!
//! Environment variables:
//! - CLUSTER_STATUS_RUN_INTEGRATION_TESTS: Set to "1" to enable integration tests
//! - CLUSTER_STATUS_TEST_MYSQL_HOST: MySQL host (default: 127.0.0.1)
//! - CLUSTER_STATUS_TEST_MYSQL_PORT: MySQL port (default: 3306)
//! - CLUSTER_STATUS_TEST_MYSQL_USER: MySQL user (default: root)
//! - CLUSTER_STATUS_TEST_MYSQL_PASS: MySQL password (default: empty)

mod cluster;
mod collector;
mod gtid;

use cluster_status::config::{InstanceConfig, PoolConfig};
use mysql::{OptsBuilder, Pool, PooledConn};
use std::env;

/// Check if integration tests should run
pub fn should_run_integration_tests() -> bool {
    env::var("CLUSTER_STATUS_RUN_INTEGRATION_TESTS")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Skip test if integration tests are not enabled
#[macro_export]
macro_rules! skip_if_not_enabled {
    () => {
        if !crate::should_run_integration_tests() {
            eprintln!(
                "Skipping integration test (set CLUSTER_STATUS_RUN_INTEGRATION_TESTS=1 to run)"
            );
            return;
        }
    };
}

/// MySQL connection config for the instance under test
#[derive(Debug, Clone)]
pub struct MysqlTestConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// Get MySQL connection config from environment
pub fn get_mysql_config() -> MysqlTestConfig {
    MysqlTestConfig {
        host: env::var("CLUSTER_STATUS_TEST_MYSQL_HOST")
            .unwrap_or_else(|_| "127.0.0.1".to_string()),
        port: env::var("CLUSTER_STATUS_TEST_MYSQL_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3306),
        user: env::var("CLUSTER_STATUS_TEST_MYSQL_USER").unwrap_or_else(|_| "root".to_string()),
        password: env::var("CLUSTER_STATUS_TEST_MYSQL_PASS").unwrap_or_default(),
    }
}

impl MysqlTestConfig {
    /// Reference client used to prepare and cross-check server state
    pub fn conn(&self) -> PooledConn {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(&self.host))
            .tcp_port(self.port)
            .user(Some(&self.user))
            .pass(Some(&self.password));
        Pool::new(opts)
            .expect("Failed to create connection pool")
            .get_conn()
            .expect("Failed to get connection")
    }

    /// The same server as an instance entry for the crate under test
    pub fn instance(&self) -> InstanceConfig {
        InstanceConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

/// Pool settings with a short connect timeout
pub fn test_pool_config() -> PoolConfig {
    PoolConfig {
        connect_timeout_ms: 2000,
        ..PoolConfig::default()
    }
}

/// An instance entry pointing at a port nothing listens on
pub fn unreachable_instance() -> InstanceConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    InstanceConfig {
        host: "127.0.0.1".to_string(),
        port,
        user: "root".to_string(),
        password: String::new(),
    }
}

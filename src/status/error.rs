use std::time::Duration;

use thiserror::Error;

/// Error returned by a query against a single instance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Server error {code} ({sql_state}): {message}")]
    Server {
        code: u16,
        sql_state: String,
        message: String,
    },
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Unexpected result: {0}")]
    Unexpected(String),
}

/// Error acquiring a connection handle to an instance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("No instance configured for ordinal {0}")]
    UnknownOrdinal(usize),
    #[error("Instance unreachable: {0}")]
    Unreachable(String),
}

/// Error fetching a secret from the object store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("Secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },
    #[error("Access to secret denied: {0}")]
    Forbidden(String),
    #[error("Object store error: {0}")]
    Store(String),
}

/// Intermediate primary options that violate the secret schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option {0}")]
    UnknownOption(String),
    #[error("PRIMARY_HOST option is required")]
    MissingHost,
    #[error("invalid PRIMARY_PORT {0:?}")]
    InvalidPort(String),
    #[error("option {0} is not valid UTF-8")]
    InvalidUtf8(String),
}

/// Error of a status collection call
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Failed to connect to instance {ordinal}: {source}")]
    Connection {
        ordinal: usize,
        #[source]
        source: AccessError,
    },
    #[error("Query failed on instance {ordinal}: {source}")]
    Query {
        ordinal: usize,
        #[source]
        source: QueryError,
    },
    #[error("cannot compare gtids")]
    CannotCompareGtids,
    /// The engine failed to evaluate a GTID comparison
    #[error("Failed to compare GTID sets: {source}")]
    GtidComparison {
        #[source]
        source: QueryError,
    },
    #[error("Failed to fetch secret {namespace}/{name}: {source}")]
    SecretFetch {
        namespace: String,
        name: String,
        #[source]
        source: SecretError,
    },
    #[error("Invalid intermediate primary options: {0}")]
    OptionValidation(#[from] OptionError),
    #[error("Status collection cancelled")]
    Cancelled,
    #[error("Status collection exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

impl StatusError {
    pub fn query(ordinal: usize, source: QueryError) -> Self {
        Self::Query { ordinal, source }
    }

    /// Ordinal of the instance the error is attributed to, if any
    pub fn ordinal(&self) -> Option<usize> {
        match self {
            Self::Connection { ordinal, .. } | Self::Query { ordinal, .. } => Some(*ordinal),
            _ => None,
        }
    }
}

//! Intermediate primary options
//!
//! A cluster that relays from a primary outside the fleet names a secret
//! holding the connection options. The payload is validated strictly:
//! only the four known keys are accepted.

use std::collections::BTreeMap;

use tracing::debug;

use super::access::SecretStore;
use super::error::{OptionError, StatusError};
use super::types::IntermediatePrimaryOptions;

pub const PRIMARY_HOST_KEY: &str = "PRIMARY_HOST";
pub const PRIMARY_PORT_KEY: &str = "PRIMARY_PORT";
pub const PRIMARY_USER_KEY: &str = "PRIMARY_USER";
pub const PRIMARY_PASSWORD_KEY: &str = "PRIMARY_PASSWORD";

/// Port used when the secret has no `PRIMARY_PORT`
pub const DEFAULT_PRIMARY_PORT: u16 = 3306;

impl IntermediatePrimaryOptions {
    /// Validate a secret payload
    pub fn from_secret_data(data: &BTreeMap<String, Vec<u8>>) -> Result<Self, OptionError> {
        let mut host = None;
        let mut port = DEFAULT_PRIMARY_PORT;
        let mut user = None;
        let mut password = None;

        for (key, value) in data {
            let value = std::str::from_utf8(value)
                .map_err(|_| OptionError::InvalidUtf8(key.clone()))?;

            match key.as_str() {
                PRIMARY_HOST_KEY => host = Some(value.to_string()),
                PRIMARY_PORT_KEY => port = parse_port(value)?,
                PRIMARY_USER_KEY => user = Some(value.to_string()),
                PRIMARY_PASSWORD_KEY => password = Some(value.to_string()),
                _ => return Err(OptionError::UnknownOption(key.clone())),
            }
        }

        let primary_host = host
            .filter(|h| !h.is_empty())
            .ok_or(OptionError::MissingHost)?;

        Ok(Self {
            primary_host,
            primary_port: port,
            primary_user: user,
            primary_password: password,
        })
    }
}

fn parse_port(value: &str) -> Result<u16, OptionError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(OptionError::InvalidPort(value.to_string())),
    }
}

/// Fetch and validate the options secret `namespace/name`
pub async fn resolve_intermediate_primary_options<S>(
    store: &S,
    namespace: &str,
    name: &str,
) -> Result<IntermediatePrimaryOptions, StatusError>
where
    S: SecretStore + ?Sized,
{
    let data = store
        .get(namespace, name)
        .await
        .map_err(|source| StatusError::SecretFetch {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        })?;

    let options = IntermediatePrimaryOptions::from_secret_data(&data)?;
    debug!(
        secret = %name,
        host = %options.primary_host,
        port = options.primary_port,
        "Resolved intermediate primary options"
    );
    Ok(options)
}

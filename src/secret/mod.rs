//! Secret stores
//!
//! `StaticSecretStore` serves secrets from memory, typically loaded from the
//! `[[secrets]]` tables of the configuration file.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tracing::debug;

use crate::config::SecretConfig;
use crate::status::{SecretError, SecretStore};

/// In-memory secret store keyed by (namespace, name)
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<(String, String), BTreeMap<String, Vec<u8>>>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a secret
    pub fn insert(&mut self, namespace: &str, name: &str, data: BTreeMap<String, Vec<u8>>) {
        self.secrets
            .insert((namespace.to_string(), name.to_string()), data);
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl From<&[SecretConfig]> for StaticSecretStore {
    fn from(configs: &[SecretConfig]) -> Self {
        let mut store = Self::new();
        for secret in configs {
            let data = secret
                .data
                .iter()
                .map(|(k, v)| (k.clone(), v.as_bytes().to_vec()))
                .collect();
            store.insert(&secret.namespace, &secret.name, data);
        }
        store
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, SecretError> {
        debug!(namespace = %namespace, name = %name, "Fetching secret");
        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}

//! Resolution tiers used by the discovery client
//!
//! The primary tier asks the registry; the secondary tier is a static,
//! read-only name -> address table consulted only when the primary fails.

use async_trait::async_trait;
use std::collections::HashMap;

use registrar_core::{Error, Result};

use crate::registry_client::RegistryClient;

/// Where a resolved address came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Cache,
    Registry,
    Fallback,
}

/// A resolved base URL for a logical service name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub source: ResolutionSource,
}

/// Translates a logical service name into a base URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<String>;
}

#[async_trait]
impl Resolver for RegistryClient {
    async fn resolve(&self, name: &str) -> Result<String> {
        self.discover(name).await.map(|resolved| resolved.url)
    }
}

/// Static fallback table, immutable after construction
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    table: HashMap<String, String>,
}

impl StaticResolver {
    #[must_use]
    pub fn new(table: HashMap<String, String>) -> Self {
        let table = table
            .into_iter()
            .map(|(name, url)| (name, url.trim_end_matches('/').to_string()))
            .collect();
        Self { table }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.table.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, url)| (name.into(), url.into()))
                .collect(),
        )
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, name: &str) -> Result<String> {
        self.get(name)
            .map(str::to_string)
            .ok_or_else(|| Error::NotFound(format!("No fallback address for '{name}'")))
    }
}

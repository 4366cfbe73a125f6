// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Selecting a backend from configuration.

use serde::Deserialize;

/// The backend selected by a [`CacheConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum CacheKind {
    /// Caching is disabled; see [`NoCache`](crate::NoCache).
    #[default]
    None,
    /// A bounded in-process cache; see [`MemoryCache`](stowage_memory::MemoryCache).
    #[cfg(feature = "memory")]
    #[serde(alias = "inmem")]
    Memory,
}

/// Deserializable cache settings, typically one section of an application's config file.
///
/// Missing fields take their defaults, so an empty section disables caching.
///
/// # Examples
///
/// ```
/// use stowage::{CacheConfig, CacheKind};
///
/// let config: CacheConfig = serde_json::from_str(r#"{ "kind": "none", "name": "api" }"#).unwrap();
/// assert_eq!(config.kind, CacheKind::None);
/// assert_eq!(config.name.as_deref(), Some("api"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Which backend to use.
    pub kind: CacheKind,
    /// A name prefixed to per-collection store names of the in-process backend.
    pub name: Option<String>,
    /// Pre-allocated capacity of each in-process collection.
    pub initial_capacity: Option<usize>,
}

impl CacheConfig {
    /// Creates a config selecting `kind` with default settings.
    #[must_use]
    pub fn new(kind: CacheKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

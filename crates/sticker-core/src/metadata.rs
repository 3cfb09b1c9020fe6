//! Resource metadata and the [`Resource`] trait.
//!
//! Every stored record is a metadata block plus a typed spec and status. The
//! metadata carries everything the store and the reconcilers coordinate on:
//! the name, the version token, finalizers and the soft-delete marker.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{ResourceKind, ResourceVersion};

/// Longest name the store accepts.
pub const MAX_NAME_LEN: usize = 253;

/// Metadata shared by all resources.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Immutable, unique per kind.
    pub name: String,
    /// Version token read at fetch time and checked at write time.
    #[serde(default)]
    pub version: ResourceVersion,
    /// Outstanding cleanup obligations.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub finalizers: BTreeSet<String>,
    /// Soft-delete marker (Unix ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<i64>,
    /// Set by the store on create (Unix ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Metadata {
    /// Metadata for a resource that has not been stored yet.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether the resource carries a deletion timestamp.
    pub fn is_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.contains(finalizer)
    }

    /// Add a finalizer. Returns `true` if it was not present before.
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.finalizers.contains(finalizer) {
            return false;
        }
        self.finalizers.insert(finalizer.to_string())
    }

    /// Remove a finalizer. Returns `true` if it was present.
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        self.finalizers.remove(finalizer)
    }

    /// Builder-style label setter.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// A typed record held by the resource store.
///
/// Implementors are plain data: the store encodes them whole and hands back
/// owned copies, so nothing outside the store holds an authoritative instance.
pub trait Resource:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The kind this type is stored under.
    const KIND: ResourceKind;

    fn metadata(&self) -> &Metadata;

    fn metadata_mut(&mut self) -> &mut Metadata;

    /// The resource name.
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// The version token this copy was read at.
    fn version(&self) -> ResourceVersion {
        self.metadata().version
    }

    fn is_deleted(&self) -> bool {
        self.metadata().is_deleted()
    }
}

/// Check that a name is usable as a store key.
///
/// Names must be non-blank, at most [`MAX_NAME_LEN`] bytes, and contain no
/// whitespace, control characters or path separators.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.len() > MAX_NAME_LEN
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '/' || c == '\\');
    if bad {
        return Err(CoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

//! Strong type definitions for sticker resources.
//!
//! Identifiers that cross the store boundary are newtypes so a version token
//! can never be confused with a sequence number or a count.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, monotonically advancing version token for optimistic concurrency.
///
/// `ResourceVersion::NEW` marks a resource that has never been persisted. The
/// store assigns `1` on create and advances the token by one on every write.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVersion(pub u64);

impl ResourceVersion {
    /// Version of a resource that has not been stored yet.
    pub const NEW: Self = Self(0);

    /// The version a successful write produces.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Get the raw value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this resource was ever persisted.
    pub const fn is_new(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceVersion({})", self.0)
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ResourceVersion {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Discriminator for the resource types the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A user-uploaded image reference.
    Sticker,
    /// A named collection of stickers.
    StickerGroup,
}

impl ResourceKind {
    /// Stable string form, used as the storage key prefix.
    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Sticker => "Sticker",
            ResourceKind::StickerGroup => "StickerGroup",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Sticker" => Some(ResourceKind::Sticker),
            "StickerGroup" => Some(ResourceKind::StickerGroup),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_advances() {
        let v = ResourceVersion::NEW;
        assert!(v.is_new());
        assert_eq!(v.next(), ResourceVersion(1));
        assert_eq!(v.next().next().get(), 2);
    }

    #[test]
    fn test_kind_string_roundtrip() {
        for kind in [ResourceKind::Sticker, ResourceKind::StickerGroup] {
            assert_eq!(ResourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::parse("Attachment"), None);
    }

    #[test]
    fn test_version_serializes_transparently() {
        let json = serde_json::to_string(&ResourceVersion(7)).unwrap();
        assert_eq!(json, "7");
    }
}

//! The StickerGroup resource.

use serde::{Deserialize, Serialize};

use crate::metadata::{Metadata, Resource};
use crate::types::ResourceKind;

/// A named collection of stickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerGroup {
    pub metadata: Metadata,
    pub spec: StickerGroupSpec,
    #[serde(default)]
    pub status: StickerGroupStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerGroupSpec {
    pub display_name: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_default: bool,
    /// Identity of the owning user.
    #[serde(default)]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    /// Ordering weight, lower first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerGroupStatus {
    /// Non-deleted stickers whose group name is this group.
    #[serde(default)]
    pub sticker_count: u64,
}

impl StickerGroup {
    pub fn new(name: impl Into<String>, spec: StickerGroupSpec) -> Self {
        Self {
            metadata: Metadata::named(name),
            spec,
            status: StickerGroupStatus::default(),
        }
    }

    /// Name of the implicit per-owner group.
    pub fn default_name_for(owner: &str) -> String {
        format!("{owner}-stickers")
    }

    /// The implicit per-owner group, not yet stored.
    pub fn default_for(owner: &str) -> Self {
        Self::new(
            Self::default_name_for(owner),
            StickerGroupSpec {
                display_name: format!("{owner}'s Stickers"),
                is_public: false,
                is_default: true,
                owner: owner.to_string(),
                ..Default::default()
            },
        )
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.spec.owner == owner
    }
}

impl Resource for StickerGroup {
    const KIND: ResourceKind = ResourceKind::StickerGroup;

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

//! The Sticker resource.

use serde::{Deserialize, Serialize};

use crate::metadata::{Metadata, Resource};
use crate::types::ResourceKind;

/// Finalizer the reconciler keeps on every live sticker.
pub const CLEANUP_FINALIZER: &str = "sticker-manager";

/// A user-uploaded image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    pub metadata: Metadata,
    pub spec: StickerSpec,
    #[serde(default)]
    pub status: StickerStatus,
}

/// Client and workflow intent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerSpec {
    /// Owning group. Empty means no group.
    #[serde(default)]
    pub group_name: String,
    /// Reference into the attachment store. Empty means none.
    #[serde(default)]
    pub attachment_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Resolved permalink, owned by the reconciler.
    #[serde(default)]
    pub url: String,
    /// Manual ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i32>,
}

/// Derived state, written only by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerStatus {
    #[serde(default)]
    pub phase: StickerPhase,
}

/// Lifecycle state of a sticker.
///
/// `Pending` and `Active` are persisted in the status. `Terminating` is
/// reported whenever the metadata carries a deletion timestamp; the record is
/// removed by the store once its finalizers are gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StickerPhase {
    /// Created but not yet converged.
    #[default]
    Pending,
    /// Converged at least once and not marked for deletion.
    Active,
    /// Marked for deletion, cleanup pending.
    Terminating,
}

impl Sticker {
    /// A fresh, never-stored sticker.
    pub fn new(name: impl Into<String>, spec: StickerSpec) -> Self {
        Self {
            metadata: Metadata::named(name),
            spec,
            status: StickerStatus::default(),
        }
    }

    /// The effective lifecycle state.
    pub fn lifecycle(&self) -> StickerPhase {
        if self.metadata.is_deleted() {
            StickerPhase::Terminating
        } else {
            self.status.phase
        }
    }

    /// Group name, or `None` when the sticker is ungrouped.
    pub fn group(&self) -> Option<&str> {
        let name = self.spec.group_name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Attachment reference, or `None` when blank.
    pub fn attachment(&self) -> Option<&str> {
        let name = self.spec.attachment_name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Whether this sticker counts toward `group`'s membership.
    pub fn is_member_of(&self, group: &str) -> bool {
        !self.metadata.is_deleted() && self.group() == Some(group)
    }
}

impl Resource for Sticker {
    const KIND: ResourceKind = ResourceKind::Sticker;

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

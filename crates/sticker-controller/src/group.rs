//! Group membership accounting.

use async_trait::async_trait;
use sticker_core::{PageRequest, ResourceKind, Sticker, StickerGroup};
use sticker_store::ResourceStore;
use tracing::{debug, info};

use crate::error::Result;
use crate::reconciler::{ReconcileResult, Reconciler, Request};

/// Recompute `group`'s sticker count and persist it if it changed.
///
/// Returns whether a write happened. A missing or deleted group is left alone.
pub async fn sync_sticker_count<S: ResourceStore>(store: &S, group: &str) -> Result<bool> {
    let Some(mut current) = store.fetch::<StickerGroup>(group).await? else {
        debug!(group = %group, "group not found, skipping count");
        return Ok(false);
    };
    if current.metadata.is_deleted() {
        return Ok(false);
    }

    let members = store
        .list(&|s: &Sticker| s.is_member_of(group), None, PageRequest::all())
        .await?
        .total as u64;
    if current.status.sticker_count == members {
        return Ok(false);
    }

    info!(
        group = %group,
        from = current.status.sticker_count,
        to = members,
        "updating sticker count"
    );
    current.status.sticker_count = members;
    store.update(current).await?;
    Ok(true)
}

/// Keeps `status.sticker_count` of each group in line with its members.
pub struct StickerGroupReconciler<S> {
    store: S,
}

impl<S: ResourceStore> StickerGroupReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: ResourceStore + 'static> Reconciler for StickerGroupReconciler<S> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::StickerGroup
    }

    async fn reconcile(&self, request: &Request) -> Result<ReconcileResult> {
        sync_sticker_count(&self.store, &request.name).await?;
        Ok(ReconcileResult::done())
    }

    async fn resync_names(&self) -> Result<Vec<String>> {
        let groups = self.store.list_all(&|_: &StickerGroup| true).await?;
        Ok(groups.into_iter().map(|g| g.metadata.name).collect())
    }
}

//! Sticker reconciliation.
//!
//! A pass drives one sticker to its derived state:
//!
//! 1. Marked for deletion: strip [`CLEANUP_FINALIZER`] so the store can
//!    remove the record, and ask for the group to be recounted.
//! 2. Otherwise keep the finalizer, resolve `spec.url` from the attachment,
//!    mark the sticker `Active` and refresh its group's count.
//!
//! Every write is conditional. A version conflict reruns the whole pass from
//! a fresh fetch.

use async_trait::async_trait;
use sticker_core::{ResourceKind, Sticker, StickerPhase, CLEANUP_FINALIZER};
use sticker_store::{AttachmentStore, ResourceStore};
use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::group::sync_sticker_count;
use crate::reconciler::{ReconcileResult, Reconciler, Request};

/// Reconciler for [`Sticker`] resources.
pub struct StickerReconciler<S, A> {
    store: S,
    attachments: A,
    config: ReconcilerConfig,
}

impl<S: ResourceStore, A: AttachmentStore> StickerReconciler<S, A> {
    pub fn new(store: S, attachments: A, config: ReconcilerConfig) -> Self {
        Self {
            store,
            attachments,
            config,
        }
    }

    async fn reconcile_once(&self, name: &str) -> Result<ReconcileResult> {
        let Some(sticker) = self.store.fetch::<Sticker>(name).await? else {
            debug!(sticker = %name, "sticker gone, nothing to do");
            return Ok(ReconcileResult::done());
        };

        if sticker.metadata.is_deleted() {
            return self.finalize(sticker).await;
        }

        let mut desired = sticker.clone();
        desired.metadata.add_finalizer(CLEANUP_FINALIZER);
        desired.spec.url = self.resolve_url(&desired).await;
        desired.status.phase = StickerPhase::Active;

        if let Some(group) = desired.group() {
            sync_sticker_count(&self.store, group).await?;
        }

        if desired == sticker {
            debug!(sticker = %name, "sticker already converged");
        } else {
            self.store.update(desired).await?;
            debug!(sticker = %name, "sticker converged");
        }
        Ok(ReconcileResult::done())
    }

    async fn finalize(&self, mut sticker: Sticker) -> Result<ReconcileResult> {
        let mut result = ReconcileResult::done();
        if let Some(group) = sticker.group() {
            result = result.with_follow_up(Request::group(group));
        }

        if sticker.metadata.remove_finalizer(CLEANUP_FINALIZER) {
            let name = sticker.metadata.name.clone();
            self.store.update(sticker).await?;
            info!(sticker = %name, "released sticker for deletion");
        }
        Ok(result)
    }

    /// The URL the sticker should carry, empty when it cannot be resolved.
    async fn resolve_url(&self, sticker: &Sticker) -> String {
        let Some(attachment_name) = sticker.attachment() else {
            if !sticker.spec.url.is_empty() {
                info!(sticker = %sticker.metadata.name, "removing url of sticker without attachment");
            }
            return String::new();
        };

        let attachment = match self.attachments.fetch(attachment_name).await {
            Ok(Some(attachment)) if !attachment.deleted => attachment,
            Ok(_) => {
                warn!(attachment = %attachment_name, "sticker attachment not found");
                return String::new();
            }
            Err(e) => {
                warn!(attachment = %attachment_name, error = %e, "failed to fetch sticker attachment");
                return String::new();
            }
        };

        let resolved = tokio::time::timeout(
            self.config.permalink_timeout,
            self.attachments.permalink(&attachment),
        )
        .await;
        match resolved {
            Ok(Ok(Some(url))) => url,
            Ok(Ok(None)) => {
                warn!(attachment = %attachment_name, "failed to get permalink for sticker attachment");
                String::new()
            }
            Ok(Err(e)) => {
                warn!(attachment = %attachment_name, error = %e, "failed to get permalink for sticker attachment");
                String::new()
            }
            Err(_) => {
                warn!(
                    attachment = %attachment_name,
                    timeout_ms = self.config.permalink_timeout.as_millis() as u64,
                    "timed out resolving permalink"
                );
                String::new()
            }
        }
    }
}

#[async_trait]
impl<S, A> Reconciler for StickerReconciler<S, A>
where
    S: ResourceStore + 'static,
    A: AttachmentStore + 'static,
{
    fn kind(&self) -> ResourceKind {
        ResourceKind::Sticker
    }

    async fn reconcile(&self, request: &Request) -> Result<ReconcileResult> {
        let mut attempt = 0;
        loop {
            match self.reconcile_once(&request.name).await {
                Err(e) if e.is_conflict() => {
                    attempt += 1;
                    if attempt > self.config.max_conflict_retries {
                        warn!(sticker = %request.name, attempt, "conflict retries exhausted, requeueing");
                        return Ok(ReconcileResult::requeue(self.config.conflict_requeue_after));
                    }
                    debug!(sticker = %request.name, attempt, "write conflict, rerunning pass");
                }
                other => return other,
            }
        }
    }

    async fn resync_names(&self) -> Result<Vec<String>> {
        let stickers = self.store.list_all(&|_: &Sticker| true).await?;
        Ok(stickers.into_iter().map(|s| s.metadata.name).collect())
    }
}

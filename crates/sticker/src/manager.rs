//! The sticker manager: one place to wire the services and the controller.

use sticker_controller::{Controller, StickerGroupReconciler, StickerReconciler};
use sticker_store::{AttachmentStore, ResourceStore};

use crate::config::StickerConfig;
use crate::error::Result;
use crate::groups::StickerGroupService;
use crate::stickers::StickerService;
use crate::upload::UploadLinkWorkflow;

/// Bundles the upload workflow, the services and the reconcilers over one
/// resource store and one attachment store.
///
/// Stores are cloned into each component, so they are usually `Arc`s.
pub struct StickerManager<S, A> {
    config: StickerConfig,
    store: S,
    attachments: A,
    uploads: UploadLinkWorkflow<S, A>,
    stickers: StickerService<S>,
    groups: StickerGroupService<S>,
}

impl<S, A> StickerManager<S, A>
where
    S: ResourceStore + Clone + 'static,
    A: AttachmentStore + Clone + 'static,
{
    /// Validate `config` and build every component.
    pub fn new(store: S, attachments: A, config: StickerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            uploads: UploadLinkWorkflow::new(store.clone(), attachments.clone(), config.clone()),
            stickers: StickerService::new(store.clone(), config.upload_retry.clone()),
            groups: StickerGroupService::new(store.clone(), config.upload_retry.clone()),
            config,
            store,
            attachments,
        })
    }

    pub fn config(&self) -> &StickerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn uploads(&self) -> &UploadLinkWorkflow<S, A> {
        &self.uploads
    }

    pub fn stickers(&self) -> &StickerService<S> {
        &self.stickers
    }

    pub fn groups(&self) -> &StickerGroupService<S> {
        &self.groups
    }

    /// A controller with the sticker and group reconcilers registered.
    pub fn controller(&self) -> Controller {
        Controller::new(self.config.controller.clone())
            .with_reconciler(StickerReconciler::new(
                self.store.clone(),
                self.attachments.clone(),
                self.config.reconcile.clone(),
            ))
            .with_reconciler(StickerGroupReconciler::new(self.store.clone()))
    }
}

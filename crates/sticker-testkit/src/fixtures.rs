//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sticker::{AttachmentSettings, FilePart, StickerConfig, StickerManager};
use sticker_controller::{StickerGroupReconciler, StickerReconciler};
use sticker_core::{Sticker, StickerGroup, StickerGroupSpec, StickerSpec};
use sticker_store::{
    chunked, Attachment, AttachmentStore, MemoryAttachmentStore, MemoryStore, ResourceStore,
    DEFAULT_POLICY,
};

/// Base URL the fixture's attachment store builds permalinks from.
pub const BASE_URL: &str = "https://cdn.test";

/// In-memory stores plus a config with the attachment setting present.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub attachments: Arc<MemoryAttachmentStore>,
    pub config: StickerConfig,
}

pub type TestManager = StickerManager<Arc<MemoryStore>, Arc<MemoryAttachmentStore>>;

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(StickerConfig::default().with_attachment(AttachmentSettings::default()))
    }

    pub fn with_config(config: StickerConfig) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            attachments: Arc::new(MemoryAttachmentStore::new(BASE_URL)),
            config,
        }
    }

    pub fn manager(&self) -> TestManager {
        StickerManager::new(self.store.clone(), self.attachments.clone(), self.config.clone())
            .expect("fixture config is valid")
    }

    pub fn sticker_reconciler(&self) -> StickerReconciler<Arc<MemoryStore>, Arc<MemoryAttachmentStore>> {
        StickerReconciler::new(
            self.store.clone(),
            self.attachments.clone(),
            self.config.reconcile.clone(),
        )
    }

    pub fn group_reconciler(&self) -> StickerGroupReconciler<Arc<MemoryStore>> {
        StickerGroupReconciler::new(self.store.clone())
    }

    /// Store a group owned by `owner`.
    pub async fn seed_group(&self, name: &str, owner: &str) -> StickerGroup {
        self.store
            .create(group(name, owner))
            .await
            .expect("seed group")
    }

    /// Store a sticker in `group`, backed by a fresh attachment.
    pub async fn seed_sticker(&self, name: &str, group: &str) -> Sticker {
        let attachment = self.seed_attachment(&format!("{name}.png"), b"png").await;
        let mut sticker = sticker(name, group);
        sticker.spec.attachment_name = attachment.name;
        self.store.create(sticker).await.expect("seed sticker")
    }

    /// Store a file directly in the attachment store.
    pub async fn seed_attachment(&self, file_name: &str, content: &[u8]) -> Attachment {
        self.attachments
            .upload(
                DEFAULT_POLICY,
                sticker::STICKER_ATTACHMENT_GROUP,
                file_name,
                chunked(content.to_vec(), 1024),
                None,
            )
            .await
            .expect("seed attachment")
    }

    /// Expected permalink for `attachment`.
    pub fn permalink(&self, attachment: &Attachment) -> String {
        format!("{BASE_URL}/{}/{}", attachment.group_name, attachment.file_name)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A never-stored sticker in `group`.
pub fn sticker(name: &str, group: &str) -> Sticker {
    Sticker::new(
        name,
        StickerSpec {
            group_name: group.to_string(),
            display_name: Some(format!("{name}.png")),
            ..Default::default()
        },
    )
}

/// A never-stored group owned by `owner`.
pub fn group(name: &str, owner: &str) -> StickerGroup {
    StickerGroup::new(
        name,
        StickerGroupSpec {
            display_name: name.to_string(),
            owner: owner.to_string(),
            ..Default::default()
        },
    )
}

/// A PNG upload of `size` zero bytes, streamed in 64 KiB chunks.
pub fn png(filename: &str, size: usize) -> FilePart {
    FilePart::new(filename, chunked(vec![0u8; size], 64 * 1024)).with_content_type("image/png")
}

/// Poll `check` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

//! The upload-and-link workflow.
//!
//! An upload runs four sequential steps, each against the latest stored state:
//!
//! 1. stream the file into the attachment store through the size guard
//! 2. resolve or create the target group
//! 3. create the sticker pointing at the attachment
//! 4. link the sticker to the group, retried on write conflicts
//!
//! Steps are not compensated. A failure after step 1 leaves an unreferenced
//! attachment; a failure in step 4 leaves an ungrouped sticker.

use std::path::Path;

use sticker_core::{validate_name, Resource, Sticker, StickerGroup, StickerGroupSpec, StickerSpec};
use sticker_store::{limit_size, Attachment, AttachmentStore, ByteStream, ResourceStore};
use tracing::info;
use uuid::Uuid;

use crate::caller::CallerContext;
use crate::config::StickerConfig;
use crate::error::Result;
use crate::form::FilePart;
use crate::groups::{ensure_owner, ensure_sticker_access, get_or_create_group};
use crate::retry::retry_on_conflict;

/// Logical attachment group every sticker file is stored under.
pub const STICKER_ATTACHMENT_GROUP: &str = "sticker-group";

/// Where an uploaded sticker should end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupTarget {
    /// The caller's default group.
    SelfDefault,
    /// A group by name, created for the caller if missing.
    Named(String),
}

impl GroupTarget {
    /// Boundary token for the caller's default group.
    pub const SELF_TOKEN: &'static str = "-";

    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value == Self::SELF_TOKEN {
            GroupTarget::SelfDefault
        } else {
            GroupTarget::Named(value.to_string())
        }
    }

    /// Reject a named target that can never be a group name, blank included.
    pub fn validate(&self) -> sticker_core::Result<()> {
        match self {
            GroupTarget::SelfDefault => Ok(()),
            GroupTarget::Named(name) => validate_name(name),
        }
    }
}

/// Attachment key for an uploaded file: a fresh uuid keeping the extension.
pub fn storage_key(filename: &str) -> String {
    let id = Uuid::new_v4();
    match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{id}.{ext}"),
        _ => id.to_string(),
    }
}

/// Uploads sticker files and links them to groups.
pub struct UploadLinkWorkflow<S, A> {
    store: S,
    attachments: A,
    config: StickerConfig,
}

impl<S: ResourceStore, A: AttachmentStore> UploadLinkWorkflow<S, A> {
    pub fn new(store: S, attachments: A, config: StickerConfig) -> Self {
        Self {
            store,
            attachments,
            config,
        }
    }

    /// Upload `file` as a new sticker in `target`.
    ///
    /// The returned sticker has its group set but no URL yet; the reconciler
    /// fills that in.
    pub async fn upload(
        &self,
        caller: &CallerContext,
        target: &GroupTarget,
        file: FilePart,
    ) -> Result<Sticker> {
        let policy = self.config.attachment_policy()?;
        target.validate()?;
        let FilePart {
            filename,
            content_type,
            content,
        } = file;

        let attachment = self
            .store_file(policy, &filename, content, content_type)
            .await?;
        let group = self.resolve_group(caller, target).await?;

        let sticker = self
            .store
            .create(Sticker::new(
                Uuid::new_v4().to_string(),
                StickerSpec {
                    attachment_name: attachment.name.clone(),
                    display_name: Some(filename),
                    ..Default::default()
                },
            ))
            .await?;
        info!(
            sticker = %sticker.metadata.name,
            group = %group.metadata.name,
            user = %caller,
            "created sticker"
        );

        self.link(sticker.name(), group.name()).await
    }

    /// Point an existing sticker at a freshly uploaded file.
    ///
    /// The URL is cleared for the reconciler to resolve again.
    pub async fn replace(
        &self,
        caller: &CallerContext,
        sticker_name: &str,
        file: FilePart,
    ) -> Result<Sticker> {
        let policy = self.config.attachment_policy()?;
        let current: Sticker = self.store.get(sticker_name).await?;
        ensure_sticker_access(&self.store, caller, &current).await?;

        let FilePart {
            filename,
            content_type,
            content,
        } = file;
        let attachment = self
            .store_file(policy, &filename, content, content_type)
            .await?;

        let store = &self.store;
        let attachment_name = attachment.name.as_str();
        let replaced = retry_on_conflict(&self.config.upload_retry, || async move {
            let mut latest: Sticker = store.get(sticker_name).await?;
            latest.spec.attachment_name = attachment_name.to_string();
            latest.spec.url = String::new();
            Ok(store.update(latest).await?)
        })
        .await?;
        info!(sticker = %sticker_name, attachment = %attachment_name, "replaced sticker file");
        Ok(replaced)
    }

    async fn store_file(
        &self,
        policy: &str,
        filename: &str,
        content: ByteStream,
        content_type: Option<String>,
    ) -> Result<Attachment> {
        let key = storage_key(filename);
        info!(file = %filename, key = %key, policy = %policy, "uploading sticker file");

        let content = limit_size(content, self.config.max_upload_bytes);
        let attachment = self
            .attachments
            .upload(policy, STICKER_ATTACHMENT_GROUP, &key, content, content_type)
            .await?;
        info!(attachment = %attachment.name, size = attachment.size, "sticker file uploaded");
        Ok(attachment)
    }

    async fn resolve_group(
        &self,
        caller: &CallerContext,
        target: &GroupTarget,
    ) -> Result<StickerGroup> {
        let wanted = match target {
            GroupTarget::SelfDefault => StickerGroup::default_for(caller.username()),
            GroupTarget::Named(name) => StickerGroup::new(
                name.as_str(),
                StickerGroupSpec {
                    display_name: name.clone(),
                    owner: caller.username().to_string(),
                    ..Default::default()
                },
            ),
        };
        let group = get_or_create_group(&self.store, wanted).await?;
        ensure_owner(caller, &group)?;
        Ok(group)
    }

    async fn link(&self, sticker: &str, group: &str) -> Result<Sticker> {
        let store = &self.store;
        retry_on_conflict(&self.config.upload_retry, || async move {
            let mut latest: Sticker = store.get(sticker).await?;
            if latest.spec.group_name == group {
                return Ok(latest);
            }
            latest.spec.group_name = group.to_string();
            Ok(store.update(latest).await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AttachmentSettings;
    use crate::error::ServiceError;
    use sticker_store::{chunked, MemoryAttachmentStore, MemoryStore};

    type Workflow = UploadLinkWorkflow<Arc<MemoryStore>, Arc<MemoryAttachmentStore>>;

    fn workflow(config: StickerConfig) -> (Workflow, Arc<MemoryStore>, Arc<MemoryAttachmentStore>) {
        let store = Arc::new(MemoryStore::new());
        let attachments = Arc::new(MemoryAttachmentStore::new("https://cdn.test"));
        let wf = UploadLinkWorkflow::new(store.clone(), attachments.clone(), config);
        (wf, store, attachments)
    }

    fn configured() -> StickerConfig {
        StickerConfig::default().with_attachment(AttachmentSettings::default())
    }

    fn png(bytes: usize) -> FilePart {
        FilePart::new("smile.png", chunked(vec![9u8; bytes], 1024)).with_content_type("image/png")
    }

    #[test]
    fn test_group_target_parse() {
        assert_eq!(GroupTarget::parse("-"), GroupTarget::SelfDefault);
        assert_eq!(GroupTarget::parse(" cats "), GroupTarget::Named("cats".into()));
        assert_eq!(GroupTarget::parse("  "), GroupTarget::Named(String::new()));
        assert!(GroupTarget::parse("  ").validate().is_err());
        assert!(GroupTarget::parse("a/b").validate().is_err());
        assert!(GroupTarget::parse("cats").validate().is_ok());
        assert!(GroupTarget::SelfDefault.validate().is_ok());
    }

    #[tokio::test]
    async fn test_blank_target_rejected_before_upload() {
        let (wf, store, attachments) = workflow(configured());
        let alice = CallerContext::new("alice");

        for target in ["", "   ", "bad name"] {
            let err = wf
                .upload(&alice, &GroupTarget::parse(target), png(4))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::ClientInput(_)), "{target:?}: {err:?}");
            assert_eq!(err.status_code(), 400);
        }
        assert_eq!(attachments.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_storage_key_keeps_extension() {
        let key = storage_key("Funny Cat.GIF");
        let (id, ext) = key.split_once('.').unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(ext, "GIF");

        let bare = storage_key("README");
        assert!(Uuid::parse_str(&bare).is_ok());
    }

    #[tokio::test]
    async fn test_upload_to_self_default_group() {
        let (wf, store, attachments) = workflow(configured());
        let alice = CallerContext::new("alice");

        let sticker = wf.upload(&alice, &GroupTarget::SelfDefault, png(10)).await.unwrap();
        assert_eq!(sticker.spec.group_name, "alice-stickers");
        assert_eq!(sticker.spec.display_name.as_deref(), Some("smile.png"));
        assert!(sticker.spec.url.is_empty());

        let attachment = attachments.fetch(&sticker.spec.attachment_name).await.unwrap().unwrap();
        assert_eq!(attachment.group_name, STICKER_ATTACHMENT_GROUP);
        assert_eq!(attachment.policy_name, "default-policy");
        assert!(attachment.file_name.ends_with(".png"));
        assert_eq!(attachment.content_type.as_deref(), Some("image/png"));

        let group: StickerGroup = store.get("alice-stickers").await.unwrap();
        assert_eq!(group.spec.display_name, "alice's Stickers");
        assert!(group.spec.is_default);
    }

    #[tokio::test]
    async fn test_upload_to_named_group_creates_it() {
        let (wf, store, _) = workflow(configured());
        let alice = CallerContext::new("alice");

        wf.upload(&alice, &GroupTarget::parse("memes"), png(4)).await.unwrap();
        let group: StickerGroup = store.get("memes").await.unwrap();
        assert_eq!(group.spec.display_name, "memes");
        assert_eq!(group.spec.owner, "alice");
    }

    #[tokio::test]
    async fn test_upload_requires_attachment_setting() {
        let (wf, _, attachments) = workflow(StickerConfig::default());
        let err = wf
            .upload(&CallerContext::new("alice"), &GroupTarget::SelfDefault, png(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
        assert!(attachments.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let mut config = configured();
        config.max_upload_bytes = 100;
        let (wf, store, attachments) = workflow(config);

        let err = wf
            .upload(&CallerContext::new("alice"), &GroupTarget::SelfDefault, png(101))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(attachments.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upload_into_foreign_group_is_refused() {
        let (wf, _, _) = workflow(configured());
        wf.upload(&CallerContext::new("alice"), &GroupTarget::parse("mine"), png(1))
            .await
            .unwrap();

        let err = wf
            .upload(&CallerContext::new("bob"), &GroupTarget::parse("mine"), png(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Permission(_)));
    }

    #[tokio::test]
    async fn test_replace_points_at_new_attachment() {
        let (wf, _, _) = workflow(configured());
        let alice = CallerContext::new("alice");
        let original = wf.upload(&alice, &GroupTarget::SelfDefault, png(3)).await.unwrap();

        let replaced = wf
            .replace(&alice, &original.metadata.name, FilePart::new("new.webp", chunked(vec![1u8; 5], 5)))
            .await
            .unwrap();
        assert_ne!(replaced.spec.attachment_name, original.spec.attachment_name);
        assert!(replaced.spec.url.is_empty());
        assert_eq!(replaced.spec.group_name, original.spec.group_name);
        assert_eq!(replaced.spec.display_name, original.spec.display_name);
    }

    #[tokio::test]
    async fn test_replace_missing_sticker() {
        let (wf, _, attachments) = workflow(configured());
        let err = wf
            .replace(&CallerContext::new("alice"), "ghost", png(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(attachments.is_empty());
    }
}

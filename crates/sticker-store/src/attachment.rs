//! Attachment store contract and an in-memory implementation.
//!
//! Attachments hold the uploaded bytes behind a sticker. Stickers only keep the
//! attachment name; the download URL is resolved through [`AttachmentStore::permalink`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AttachmentError, AttachmentResult};
use crate::stream::ByteStream;

/// Policy every store knows about.
pub const DEFAULT_POLICY: &str = "default-policy";

/// A stored attachment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub policy_name: String,
    pub group_name: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size: u64,
    /// Marked for removal; no longer resolvable.
    #[serde(default)]
    pub deleted: bool,
}

/// Blob storage for uploaded sticker files.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store `content` under `file_name` in the given policy and logical group.
    ///
    /// The stream is consumed until it ends or yields an error; on error
    /// nothing is stored.
    async fn upload(
        &self,
        policy: &str,
        group: &str,
        file_name: &str,
        content: ByteStream,
        content_type: Option<String>,
    ) -> AttachmentResult<Attachment>;

    /// Look up an attachment by name.
    async fn fetch(&self, name: &str) -> AttachmentResult<Option<Attachment>>;

    /// Resolve the public URL of an attachment, if it has one.
    async fn permalink(&self, attachment: &Attachment) -> AttachmentResult<Option<String>>;
}

#[async_trait]
impl<S: AttachmentStore + ?Sized> AttachmentStore for Arc<S> {
    async fn upload(
        &self,
        policy: &str,
        group: &str,
        file_name: &str,
        content: ByteStream,
        content_type: Option<String>,
    ) -> AttachmentResult<Attachment> {
        (**self)
            .upload(policy, group, file_name, content, content_type)
            .await
    }

    async fn fetch(&self, name: &str) -> AttachmentResult<Option<Attachment>> {
        (**self).fetch(name).await
    }

    async fn permalink(&self, attachment: &Attachment) -> AttachmentResult<Option<String>> {
        (**self).permalink(attachment).await
    }
}

/// In-memory attachment store.
///
/// Permalinks are `{base_url}/{group}/{file_name}`. Test hooks let callers
/// delete attachments, slow down permalink resolution and make it fail.
pub struct MemoryAttachmentStore {
    base_url: String,
    policies: RwLock<HashSet<String>>,
    attachments: RwLock<HashMap<String, StoredAttachment>>,
    permalink_delay: RwLock<Option<Duration>>,
    fail_permalinks: AtomicBool,
}

struct StoredAttachment {
    record: Attachment,
    bytes: Vec<u8>,
}

impl MemoryAttachmentStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut policies = HashSet::new();
        policies.insert(DEFAULT_POLICY.to_string());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policies: RwLock::new(policies),
            attachments: RwLock::new(HashMap::new()),
            permalink_delay: RwLock::new(None),
            fail_permalinks: AtomicBool::new(false),
        }
    }

    /// Register an additional storage policy.
    pub fn with_policy(self, policy: impl Into<String>) -> Self {
        if let Ok(mut policies) = self.policies.write() {
            policies.insert(policy.into());
        }
        self
    }

    /// Number of stored attachments.
    pub fn len(&self) -> usize {
        self.attachments.read().map(|a| a.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored bytes of an attachment.
    pub fn content(&self, name: &str) -> Option<Vec<u8>> {
        let attachments = self.attachments.read().ok()?;
        attachments.get(name).map(|a| a.bytes.clone())
    }

    /// Flag an attachment as deleted. Returns false if it does not exist.
    pub fn mark_deleted(&self, name: &str) -> bool {
        match self.attachments.write() {
            Ok(mut attachments) => match attachments.get_mut(name) {
                Some(stored) => {
                    stored.record.deleted = true;
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Drop an attachment entirely.
    pub fn remove(&self, name: &str) -> bool {
        self.attachments
            .write()
            .map(|mut a| a.remove(name).is_some())
            .unwrap_or(false)
    }

    /// Delay every permalink resolution by `delay`.
    pub fn set_permalink_delay(&self, delay: Option<Duration>) {
        if let Ok(mut slot) = self.permalink_delay.write() {
            *slot = delay;
        }
    }

    /// Make permalink resolution return a backend error.
    pub fn set_fail_permalinks(&self, fail: bool) {
        self.fail_permalinks.store(fail, Ordering::SeqCst);
    }

    fn poisoned() -> AttachmentError {
        AttachmentError::Backend("attachment store lock poisoned".into())
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn upload(
        &self,
        policy: &str,
        group: &str,
        file_name: &str,
        mut content: ByteStream,
        content_type: Option<String>,
    ) -> AttachmentResult<Attachment> {
        let known = self
            .policies
            .read()
            .map_err(|_| Self::poisoned())?
            .contains(policy);
        if !known {
            return Err(AttachmentError::PolicyNotFound(policy.to_string()));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = content.next().await {
            bytes.extend_from_slice(&chunk?);
        }

        let record = Attachment {
            name: uuid::Uuid::new_v4().to_string(),
            policy_name: policy.to_string(),
            group_name: group.to_string(),
            file_name: file_name.to_string(),
            content_type,
            size: bytes.len() as u64,
            deleted: false,
        };
        debug!(attachment = %record.name, size = record.size, "stored attachment");

        self.attachments
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(
                record.name.clone(),
                StoredAttachment {
                    record: record.clone(),
                    bytes,
                },
            );
        Ok(record)
    }

    async fn fetch(&self, name: &str) -> AttachmentResult<Option<Attachment>> {
        let attachments = self.attachments.read().map_err(|_| Self::poisoned())?;
        Ok(attachments.get(name).map(|a| a.record.clone()))
    }

    async fn permalink(&self, attachment: &Attachment) -> AttachmentResult<Option<String>> {
        let delay = *self.permalink_delay.read().map_err(|_| Self::poisoned())?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_permalinks.load(Ordering::SeqCst) {
            return Err(AttachmentError::Permalink {
                name: attachment.name.clone(),
                message: "backend unavailable".into(),
            });
        }
        if attachment.deleted {
            return Ok(None);
        }
        Ok(Some(format!(
            "{}/{}/{}",
            self.base_url, attachment.group_name, attachment.file_name
        )))
    }
}

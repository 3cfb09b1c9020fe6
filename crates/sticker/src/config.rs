//! Service configuration.
//!
//! Durations are whole milliseconds in JSON.

use serde::{Deserialize, Serialize};
use sticker_controller::{ControllerConfig, ReconcilerConfig};
use sticker_store::DEFAULT_POLICY;

use crate::error::{Result, ServiceError};
use crate::retry::RetryPolicy;

/// Default cap on an uploaded sticker file: 2 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;

/// Where uploaded sticker files are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSettings {
    /// Storage policy; blank means [`DEFAULT_POLICY`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,
}

impl AttachmentSettings {
    pub fn with_policy(policy: impl Into<String>) -> Self {
        Self {
            policy_name: Some(policy.into()),
        }
    }

    /// The policy to upload with.
    pub fn effective_policy(&self) -> &str {
        match self.policy_name.as_deref().map(str::trim) {
            Some(policy) if !policy.is_empty() => policy,
            _ => DEFAULT_POLICY,
        }
    }
}

/// Top-level settings for the sticker services and their controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StickerConfig {
    /// Attachment settings. Uploads are refused while this is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentSettings>,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: u64,
    /// Conflict retry for the upload workflow and service writes.
    pub upload_retry: RetryPolicy,
    pub reconcile: ReconcilerConfig,
    pub controller: ControllerConfig,
}

impl Default for StickerConfig {
    fn default() -> Self {
        Self {
            attachment: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_retry: RetryPolicy::default(),
            reconcile: ReconcilerConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

impl StickerConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ServiceError::Configuration(format!("invalid sticker config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Default settings with attachment storage configured.
    pub fn with_attachment(mut self, settings: AttachmentSettings) -> Self {
        self.attachment = Some(settings);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(ServiceError::Configuration(
                "maxUploadBytes must be greater than zero".into(),
            ));
        }
        if self.controller.workers == 0 {
            return Err(ServiceError::Configuration(
                "controller.workers must be greater than zero".into(),
            ));
        }
        if self.controller.resync_interval.is_some_and(|period| period.is_zero()) {
            return Err(ServiceError::Configuration(
                "controller.resyncInterval must be greater than zero; omit it to disable resync".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.upload_retry.jitter) {
            return Err(ServiceError::Configuration(
                "uploadRetry.jitter must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }

    /// The attachment policy to upload with.
    pub fn attachment_policy(&self) -> Result<&str> {
        self.attachment
            .as_ref()
            .map(AttachmentSettings::effective_policy)
            .ok_or_else(|| ServiceError::Configuration("attachment setting is not configured".into()))
    }
}

//! Sticker reads and edits.

use serde::{Deserialize, Serialize};
use sticker_controller::sync_sticker_count;
use sticker_core::{ListResult, Sticker, StickerGroup, StickerQuery};
use sticker_store::ResourceStore;
use tracing::{info, warn};

use crate::caller::CallerContext;
use crate::error::Result;
use crate::groups::{ensure_owner, ensure_sticker_access};
use crate::retry::{retry_on_conflict, RetryPolicy};

/// Client-editable sticker fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i32>,
}

impl StickerPatch {
    fn apply(&self, sticker: &mut Sticker) {
        if let Some(display_name) = &self.display_name {
            sticker.spec.display_name = Some(display_name.clone());
        }
        if let Some(description) = &self.description {
            sticker.spec.description = Some(description.clone());
        }
        if let Some(sequence) = self.sequence {
            sticker.spec.sequence = Some(sequence);
        }
    }
}

pub struct StickerService<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: ResourceStore> StickerService<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub async fn get(&self, name: &str) -> Result<Sticker> {
        Ok(self.store.get(name).await?)
    }

    /// Filter, order and page stickers.
    pub async fn list(&self, query: &StickerQuery) -> Result<ListResult<Sticker>> {
        let filter = query.filter();
        let order = query.order();
        Ok(self
            .store
            .list(
                &|s: &Sticker| filter.matches(s),
                Some(&|a: &Sticker, b: &Sticker| order.compare(a, b)),
                query.page,
            )
            .await?)
    }

    /// Edit display fields of a sticker the caller may access.
    pub async fn update(
        &self,
        caller: &CallerContext,
        name: &str,
        patch: StickerPatch,
    ) -> Result<Sticker> {
        let store = &self.store;
        let patch = &patch;
        retry_on_conflict(&self.retry, || async move {
            let mut latest: Sticker = store.get(name).await?;
            ensure_sticker_access(store, caller, &latest).await?;
            patch.apply(&mut latest);
            Ok(store.update(latest).await?)
        })
        .await
    }

    /// Move a sticker into another of the caller's groups.
    ///
    /// The previous group is recounted here; the new group is recounted by the
    /// sticker's next reconcile.
    pub async fn move_to_group(
        &self,
        caller: &CallerContext,
        name: &str,
        group: &str,
    ) -> Result<Sticker> {
        let target: StickerGroup = self.store.get(group).await?;
        ensure_owner(caller, &target)?;

        let store = &self.store;
        let (moved, previous) = retry_on_conflict(&self.retry, || async move {
            let mut latest: Sticker = store.get(name).await?;
            ensure_sticker_access(store, caller, &latest).await?;
            let previous = latest.group().map(str::to_string);
            latest.spec.group_name = group.to_string();
            Ok((store.update(latest).await?, previous))
        })
        .await?;
        info!(sticker = %name, group = %group, "moved sticker");

        if let Some(previous) = previous.filter(|p| p != group) {
            let previous_group = previous.as_str();
            let recount = retry_on_conflict(&self.retry, || async move {
                Ok(sync_sticker_count(store, previous_group).await?)
            })
            .await;
            if let Err(e) = recount {
                warn!(group = %previous, error = %e, "failed to recount previous group");
            }
        }
        Ok(moved)
    }

    /// Mark a sticker for deletion.
    ///
    /// While the cleanup finalizer is present the sticker stays visible as
    /// terminating until the reconciler releases it.
    pub async fn delete(&self, name: &str) -> Result<Sticker> {
        let store = &self.store;
        let deleted = retry_on_conflict(&self.retry, || async move {
            let latest: Sticker = store.get(name).await?;
            Ok(store.delete(latest).await?)
        })
        .await?;
        info!(sticker = %name, "deleted sticker");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ServiceError;
    use sticker_core::{StickerGroupSpec, StickerSorter, StickerSpec};
    use sticker_store::MemoryStore;

    async fn seeded() -> StickerService<Arc<MemoryStore>> {
        let store = Arc::new(MemoryStore::new());
        for (owner, group) in [("alice", "a1"), ("alice", "a2"), ("bob", "b1")] {
            store
                .create(StickerGroup::new(
                    group,
                    StickerGroupSpec {
                        display_name: group.into(),
                        owner: owner.into(),
                        ..Default::default()
                    },
                ))
                .await
                .unwrap();
        }
        for (name, group, display, sequence) in [
            ("s1", "a1", "Happy Cat", Some(2)),
            ("s2", "a1", "Sad Dog", Some(1)),
            ("s3", "b1", "Bob's", None),
        ] {
            store
                .create(Sticker::new(
                    name,
                    StickerSpec {
                        group_name: group.into(),
                        display_name: Some(display.into()),
                        sequence,
                        ..Default::default()
                    },
                ))
                .await
                .unwrap();
        }
        StickerService::new(store, RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_list_applies_query() {
        let svc = seeded().await;
        let page = svc
            .list(&StickerQuery::new().group("a1").sort(StickerSorter::Sequence, true))
            .await
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|s| s.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["s2", "s1"]);

        let cats = svc.list(&StickerQuery::new().keyword("CAT")).await.unwrap();
        assert_eq!(cats.total, 1);
        assert_eq!(cats.items[0].metadata.name, "s1");
    }

    #[tokio::test]
    async fn test_update_patches_display_fields() {
        let svc = seeded().await;
        let alice = CallerContext::new("alice");
        let patch = StickerPatch {
            description: Some("grumpy".into()),
            sequence: Some(9),
            ..Default::default()
        };
        let updated = svc.update(&alice, "s1", patch).await.unwrap();
        assert_eq!(updated.spec.description.as_deref(), Some("grumpy"));
        assert_eq!(updated.spec.sequence, Some(9));
        assert_eq!(updated.spec.display_name.as_deref(), Some("Happy Cat"));
    }

    #[tokio::test]
    async fn test_update_in_foreign_group_is_refused() {
        let svc = seeded().await;
        let err = svc
            .update(&CallerContext::new("alice"), "s3", StickerPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Permission(_)));
    }

    #[tokio::test]
    async fn test_move_recounts_previous_group() {
        let svc = seeded().await;
        let alice = CallerContext::new("alice");
        sync_sticker_count(&svc.store, "a1").await.unwrap();

        let moved = svc.move_to_group(&alice, "s1", "a2").await.unwrap();
        assert_eq!(moved.spec.group_name, "a2");
        let old: StickerGroup = svc.store.get("a1").await.unwrap();
        assert_eq!(old.status.sticker_count, 1);

        let err = svc.move_to_group(&alice, "s2", "b1").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_delete_without_finalizer_removes() {
        let svc = seeded().await;
        svc.delete("s2").await.unwrap();
        assert!(matches!(svc.get("s2").await.unwrap_err(), ServiceError::NotFound(_)));
    }
}

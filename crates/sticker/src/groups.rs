//! Owner-scoped sticker group management.

use std::cmp::Ordering;

use sticker_core::{Resource, Sticker, StickerGroup, StickerGroupSpec};
use sticker_store::ResourceStore;
use tracing::{debug, info};

use crate::caller::CallerContext;
use crate::error::{Result, ServiceError};
use crate::retry::{retry_on_conflict, RetryPolicy};

/// Return the stored group named like `group`, creating it if it is missing.
///
/// Losing a create race to a concurrent caller is not an error: the winner's
/// group is fetched and returned.
pub(crate) async fn get_or_create_group<S: ResourceStore>(
    store: &S,
    group: StickerGroup,
) -> Result<StickerGroup> {
    if let Some(existing) = store.fetch::<StickerGroup>(group.name()).await? {
        return Ok(existing);
    }

    let name = group.metadata.name.clone();
    match store.create(group).await {
        Ok(created) => {
            info!(group = %name, owner = %created.spec.owner, "created sticker group");
            Ok(created)
        }
        Err(e) if e.is_already_exists() => {
            debug!(group = %name, "group created concurrently, using existing");
            Ok(store.get(&name).await?)
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn ensure_owner(caller: &CallerContext, group: &StickerGroup) -> Result<()> {
    if caller.owns(group) {
        Ok(())
    } else {
        Err(ServiceError::Permission(format!(
            "sticker group {:?} is not owned by {caller}",
            group.metadata.name
        )))
    }
}

/// Stickers in a group the caller does not own are off limits.
pub(crate) async fn ensure_sticker_access<S: ResourceStore>(
    store: &S,
    caller: &CallerContext,
    sticker: &Sticker,
) -> Result<()> {
    let Some(group) = sticker.group() else {
        return Ok(());
    };
    match store.fetch::<StickerGroup>(group).await? {
        Some(group) => ensure_owner(caller, &group),
        None => Ok(()),
    }
}

/// Priority ascending with unset priorities last, then name.
fn by_priority(a: &StickerGroup, b: &StickerGroup) -> Ordering {
    let rank = |g: &StickerGroup| (g.spec.priority.is_none(), g.spec.priority);
    rank(a)
        .cmp(&rank(b))
        .then_with(|| a.metadata.name.cmp(&b.metadata.name))
}

/// Group CRUD on behalf of an explicit caller.
pub struct StickerGroupService<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: ResourceStore> StickerGroupService<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// The caller's default group, created on first use.
    pub async fn get_or_create_default(&self, caller: &CallerContext) -> Result<StickerGroup> {
        let default = StickerGroup::default_for(caller.username());
        let group = get_or_create_group(&self.store, default).await?;
        ensure_owner(caller, &group)?;
        Ok(group)
    }

    /// Groups owned by the caller, by priority then name.
    ///
    /// A caller without any group gets their default group created.
    pub async fn list_mine(&self, caller: &CallerContext) -> Result<Vec<StickerGroup>> {
        let owner = caller.username();
        let groups = self
            .store
            .list(
                &|g: &StickerGroup| g.is_owned_by(owner) && !g.metadata.is_deleted(),
                Some(&by_priority),
                sticker_core::PageRequest::all(),
            )
            .await?
            .items;

        if groups.is_empty() {
            return Ok(vec![self.get_or_create_default(caller).await?]);
        }
        Ok(groups)
    }

    /// Fetch one of the caller's groups.
    pub async fn get(&self, caller: &CallerContext, name: &str) -> Result<StickerGroup> {
        let group: StickerGroup = self.store.get(name).await?;
        ensure_owner(caller, &group)?;
        Ok(group)
    }

    /// Create a group owned by the caller. A blank name gets a generated one.
    pub async fn create(
        &self,
        caller: &CallerContext,
        name: Option<&str>,
        mut spec: StickerGroupSpec,
    ) -> Result<StickerGroup> {
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        spec.owner = caller.username().to_string();

        let created = self.store.create(StickerGroup::new(name, spec)).await?;
        info!(group = %created.metadata.name, owner = %caller, "created sticker group");
        Ok(created)
    }

    /// Replace the spec of one of the caller's groups.
    ///
    /// Metadata and status come from the latest stored copy; the owner cannot
    /// be changed.
    pub async fn update(
        &self,
        caller: &CallerContext,
        name: &str,
        spec: StickerGroupSpec,
    ) -> Result<StickerGroup> {
        let store = &self.store;
        let spec = &spec;
        retry_on_conflict(&self.retry, || async move {
            let mut latest: StickerGroup = store.get(name).await?;
            ensure_owner(caller, &latest)?;
            latest.spec = StickerGroupSpec {
                owner: caller.username().to_string(),
                ..spec.clone()
            };
            Ok(store.update(latest).await?)
        })
        .await
    }

    /// Delete one of the caller's groups. Its stickers are left in place.
    pub async fn delete(&self, caller: &CallerContext, name: &str) -> Result<StickerGroup> {
        let store = &self.store;
        let deleted = retry_on_conflict(&self.retry, || async move {
            let latest: StickerGroup = store.get(name).await?;
            ensure_owner(caller, &latest)?;
            Ok(store.delete(latest).await?)
        })
        .await?;
        info!(group = %name, owner = %caller, "deleted sticker group");
        Ok(deleted)
    }
}

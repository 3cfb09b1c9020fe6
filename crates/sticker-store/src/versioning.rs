//! Write rules shared by every backend.
//!
//! Backends look up the stored copy, run one of these functions, and then
//! either put the returned resource or remove it. Keeping the rules here
//! guarantees the SQLite and memory stores agree on versions and deletion.

use sticker_core::{validate_name, Resource, ResourceVersion};

use crate::error::{Result, StoreError};

/// What a backend must do after a write is accepted.
#[derive(Debug)]
pub(crate) enum Write<R> {
    /// Persist this value.
    Put(R),
    /// Physically remove the record; this is its last state.
    Remove(R),
}

pub(crate) fn prepare_create<R: Resource>(mut resource: R, now: i64) -> Result<R> {
    validate_name(resource.name()).map_err(|e| StoreError::Invalid(e.to_string()))?;
    let meta = resource.metadata_mut();
    meta.version = ResourceVersion(1);
    meta.creation_timestamp = Some(now);
    meta.deletion_timestamp = None;
    Ok(resource)
}

pub(crate) fn prepare_update<R: Resource>(stored: &R, mut incoming: R) -> Result<Write<R>> {
    check_version(stored, &incoming)?;
    carry_store_fields(stored, &mut incoming);

    let meta = incoming.metadata();
    if meta.is_deleted() && meta.finalizers.is_empty() {
        Ok(Write::Remove(incoming))
    } else {
        Ok(Write::Put(incoming))
    }
}

pub(crate) fn prepare_delete<R: Resource>(
    stored: &R,
    mut incoming: R,
    now: i64,
) -> Result<Write<R>> {
    check_version(stored, &incoming)?;
    carry_store_fields(stored, &mut incoming);

    let meta = incoming.metadata_mut();
    if meta.deletion_timestamp.is_none() {
        meta.deletion_timestamp = Some(now);
    }
    if meta.finalizers.is_empty() {
        Ok(Write::Remove(incoming))
    } else {
        Ok(Write::Put(incoming))
    }
}

fn check_version<R: Resource>(stored: &R, incoming: &R) -> Result<()> {
    if stored.version() != incoming.version() {
        return Err(StoreError::Conflict {
            kind: R::KIND,
            name: stored.name().to_string(),
            expected: incoming.version(),
            actual: stored.version(),
        });
    }
    Ok(())
}

/// Advance the version and keep the fields only the store may set.
///
/// A deletion mark can never be cleared by a client write.
fn carry_store_fields<R: Resource>(stored: &R, incoming: &mut R) {
    let stored = stored.metadata();
    let meta = incoming.metadata_mut();
    meta.version = stored.version.next();
    meta.creation_timestamp = stored.creation_timestamp;
    if stored.deletion_timestamp.is_some() {
        meta.deletion_timestamp = stored.deletion_timestamp;
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sticker_core::{Sticker, StickerSpec};

    fn stored() -> Sticker {
        prepare_create(Sticker::new("s1", StickerSpec::default()), 100).unwrap()
    }

    #[test]
    fn test_create_assigns_first_version() {
        let s = stored();
        assert_eq!(s.version(), ResourceVersion(1));
        assert_eq!(s.metadata.creation_timestamp, Some(100));
    }

    #[test]
    fn test_create_rejects_bad_name() {
        let err = prepare_create(Sticker::new("", StickerSpec::default()), 1).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_stale_update_conflicts() {
        let current = stored();
        let mut stale = current.clone();
        stale.metadata.version = ResourceVersion(0);
        let err = prepare_update(&current, stale).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_update_cannot_clear_deletion_mark() {
        let mut current = stored();
        current.metadata.deletion_timestamp = Some(5);
        current.metadata.add_finalizer("f");

        let mut incoming = current.clone();
        incoming.metadata.deletion_timestamp = None;
        match prepare_update(&current, incoming).unwrap() {
            Write::Put(s) => {
                assert_eq!(s.metadata.deletion_timestamp, Some(5));
                assert_eq!(s.version(), ResourceVersion(2));
            }
            Write::Remove(_) => panic!("finalizer still present"),
        }
    }

    #[test]
    fn test_update_removing_last_finalizer_of_deleted_removes() {
        let mut current = stored();
        current.metadata.deletion_timestamp = Some(5);
        current.metadata.add_finalizer("f");

        let mut incoming = current.clone();
        incoming.metadata.remove_finalizer("f");
        assert!(matches!(
            prepare_update(&current, incoming).unwrap(),
            Write::Remove(_)
        ));
    }

    #[test]
    fn test_delete_with_finalizer_only_marks() {
        let mut current = stored();
        current.metadata.add_finalizer("f");
        match prepare_delete(&current, current.clone(), 42).unwrap() {
            Write::Put(s) => assert_eq!(s.metadata.deletion_timestamp, Some(42)),
            Write::Remove(_) => panic!("finalizer still present"),
        }
    }

    #[test]
    fn test_delete_without_finalizer_removes() {
        let current = stored();
        assert!(matches!(
            prepare_delete(&current, current.clone(), 42).unwrap(),
            Write::Remove(_)
        ));
    }
}

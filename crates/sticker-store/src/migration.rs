//! SQLite schema versions.
//!
//! Applied versions are recorded in `schema_migrations`; each step moves the
//! schema from N to N+1 inside one transaction.

use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::versioning::now_millis;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Bring the schema up to [`CURRENT_VERSION`].
///
/// Running it against an up-to-date database does nothing. A database written
/// by a newer release is refused.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// v1: the resources table.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per resource; body is the CBOR-encoded resource
        CREATE TABLE resources (
            kind TEXT NOT NULL,               -- ResourceKind::as_str
            name TEXT NOT NULL,
            version INTEGER NOT NULL,         -- optimistic concurrency token
            deleted_at INTEGER,               -- soft-delete marker (Unix ms)
            created_at INTEGER NOT NULL,
            body BLOB NOT NULL,

            PRIMARY KEY (kind, name)
        );

        CREATE INDEX idx_resources_kind ON resources(kind);
        CREATE INDEX idx_resources_deleted ON resources(kind, deleted_at);
        "#,
    )?;

    Ok(())
}

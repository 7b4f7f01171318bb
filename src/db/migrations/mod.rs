//! Schema migrations for the local record database.
//!
//! Each migration has a pair of files in this directory:
//! - `migration_NN_up.sql` takes the schema from version `NN-1` to `NN`
//! - `migration_NN_down.sql` takes it back from `NN` to `NN-1`

use crate::Result;
use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

/// The schema version this build of the app expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

struct Migration {
    /// The version the database is at after running `up_sql`.
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

fn migration(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

/// Creates the `schema_version` table on a fresh database and records version 0.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to read schema_version")?;
    if count == 0 {
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(pool)
            .await
            .context("Failed to insert initial schema version")?;
    }
    Ok(())
}

/// Reads the schema version of the database.
pub(crate) async fn version(pool: &SqlitePool) -> Result<i32> {
    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to query schema version")?;
    Ok(version.unwrap_or(0))
}

/// Moves the database schema from `current` to `target`, one version at a time.
///
/// Every required migration is checked for before any of them runs. Each step runs in its own
/// transaction together with the `schema_version` update.
pub(crate) async fn run(pool: &SqlitePool, current: i32, target: i32) -> Result<()> {
    if current == target {
        debug!("Database already at version {target}");
        return Ok(());
    }
    validate(current, target)?;

    if current < target {
        for version in (current + 1)..=target {
            debug!("Running migration {version:02} (up)");
            apply(pool, migration(version)?.up_sql, version).await?;
        }
    } else {
        for version in ((target + 1)..=current).rev() {
            debug!("Running migration {version:02} (down)");
            apply(pool, migration(version)?.down_sql, version - 1).await?;
        }
    }

    debug!("Database schema is now at version {target}");
    Ok(())
}

async fn apply(pool: &SqlitePool, sql: &str, new_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(sql)
        .await
        .with_context(|| format!("Failed to migrate to schema version {new_version}"))?;

    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")
}

fn validate(current: i32, target: i32) -> Result<()> {
    let (low, high) = if current < target {
        (current + 1, target)
    } else {
        (target + 1, current)
    };
    if let Some(missing) = (low..=high).find(|v| !MIGRATIONS.iter().any(|m| m.version == *v)) {
        bail!("Migration {missing} is missing but required to migrate from version {current} to {target}");
    }
    Ok(())
}

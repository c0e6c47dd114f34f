//! Database schema migrations.
//!
//! Migration files are stored in this directory with the naming convention:
//! - `migration_NN_up.sql` - Upgrades schema from version `NN-1` to version `NN`
//! - `migration_NN_down.sql` - Downgrades schema from version `NN` to version `NN-1`

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::Result;

/// A database migration with up and down SQL.
struct Migration {
    /// The version this migration brings the database to (when going up).
    version: i32,
    /// SQL to execute when upgrading to this version.
    up_sql: &'static str,
    /// SQL to execute when downgrading from this version.
    down_sql: &'static str,
}

/// All available migrations in order.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

/// Runs migrations to bring the database from `current_ver` to `target_ver`,
/// up or down as needed. Each migration executes inside a transaction that
/// also updates the `schema_version` table. Validates that every required
/// migration exists before running any of them.
pub(crate) async fn run(pool: &SqlitePool, current_ver: i32, target_ver: i32) -> Result<()> {
    if current_ver == target_ver {
        debug!("Database already at target version {target_ver}, no migrations needed");
        return Ok(());
    }

    validate_migrations(current_ver, target_ver)?;

    if current_ver < target_ver {
        for version in (current_ver + 1)..=target_ver {
            let migration = find(version)?;
            debug!("Running migration {version:02} (up)");
            run_single_migration(pool, migration.up_sql, version).await?;
        }
    } else {
        for version in (target_ver + 1..=current_ver).rev() {
            let migration = find(version)?;
            debug!("Running migration {version:02} (down)");
            run_single_migration(pool, migration.down_sql, version - 1).await?;
        }
    }

    debug!("Migration complete, schema now at version {target_ver}");
    Ok(())
}

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

/// Executes a single migration's SQL and updates schema_version, all within a transaction.
async fn run_single_migration(pool: &SqlitePool, sql: &str, new_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    // The migration SQL may contain multiple statements.
    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *tx)
        .await
        .context("Failed to clear schema_version")?;

    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")?;

    Ok(())
}

/// Validates that migrations are available for all versions needed to go from
/// `current_version` to `target_version`.
fn validate_migrations(current_version: i32, target_version: i32) -> Result<()> {
    let (start, end) = if current_version < target_version {
        (current_version + 1, target_version)
    } else {
        (target_version + 1, current_version)
    };

    for version in start..=end {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!(
                "Migration {version} is missing but required to migrate from version {current_version} to {target_version}"
            );
        }
    }

    Ok(())
}

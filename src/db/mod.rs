//! This module is responsible for reading, writing and managing the SQLite
//! database of purchases.
//!
//! Connection failures, missing rows and constraint violations are reported
//! as [`StoreError`] kinds inside the `anyhow` chain so callers can downcast
//! when they need to distinguish them.

mod migrations;

use crate::error::StoreError;
use crate::model::Purchase;
use crate::Result;
use anyhow::{bail, Context};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// The schema version this build of the program expects.
const SCHEMA_VERSION: i32 = 1;

/// A handle to the SQLite database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Creates a new SQLite file at `path` (erroring if one already exists),
    /// initializes the schema and returns a ready-to-use handle.
    pub async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at {}", path.display());
        }
        let pool = connect(path, true).await?;

        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create schema_version table")?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .context("Failed to write initial schema version")?;

        migrations::run(&pool, 0, SCHEMA_VERSION).await?;
        debug!("Initialized database at {}", path.display());
        Ok(Self { pool })
    }

    /// Opens the SQLite file at `path`, running migrations if the schema is
    /// out-of-date.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!(
                "No database found at {}, run 'spesa init' first",
                path.display()
            );
        }
        let pool = connect(path, false).await?;
        let current = current_version(&pool).await?;
        migrations::run(&pool, current, SCHEMA_VERSION).await?;
        Ok(Self { pool })
    }

    /// All purchases recorded for `year`, in row id order.
    pub async fn purchases_by_year(&self, year: &str) -> Result<Vec<Purchase>> {
        let rows = sqlx::query(
            "SELECT id, description, price, year, month FROM purchases \
             WHERE year = ? ORDER BY id",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::classify)?;
        rows.iter().map(purchase_from_row).collect()
    }

    /// All purchases recorded for `year`/`month`, in row id order.
    pub async fn purchases_by_period(&self, year: &str, month: &str) -> Result<Vec<Purchase>> {
        let rows = sqlx::query(
            "SELECT id, description, price, year, month FROM purchases \
             WHERE year = ? AND month = ? ORDER BY id",
        )
        .bind(year)
        .bind(month)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::classify)?;
        rows.iter().map(purchase_from_row).collect()
    }

    /// Inserts one purchase and returns the row id assigned by SQLite.
    pub async fn insert_purchase(&self, purchase: &Purchase) -> Result<i64> {
        let mut conn = acquire(&self.pool).await?;
        insert_row(&mut conn, purchase).await
    }

    /// Updates the editable fields (description and price) of a persisted
    /// purchase. The period columns are fixed at insert time.
    pub async fn update_purchase(&self, purchase: &Purchase) -> Result<()> {
        let mut conn = acquire(&self.pool).await?;
        update_row(&mut conn, purchase).await
    }

    /// Deletes one purchase by row id.
    pub async fn delete_purchase(&self, id: i64) -> Result<()> {
        let mut conn = acquire(&self.pool).await?;
        delete_row(&mut conn, id).await
    }

    /// Applies an edit session's accumulated changes in one transaction:
    /// updates first, then inserts, then deletes. Either every change lands
    /// or none do. Returns the row ids assigned to `inserts`, in order.
    pub async fn apply_batch(
        &self,
        updates: &[Purchase],
        inserts: &[Purchase],
        delete_ids: &[i64],
    ) -> Result<Vec<i64>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StoreError::classify)
            .context("Failed to begin save transaction")?;

        for purchase in updates {
            update_row(&mut tx, purchase).await?;
        }

        let mut new_ids = Vec::with_capacity(inserts.len());
        for purchase in inserts {
            new_ids.push(insert_row(&mut tx, purchase).await?);
        }

        for &id in delete_ids {
            delete_row(&mut tx, id).await?;
        }

        tx.commit()
            .await
            .map_err(StoreError::classify)
            .context("Failed to commit save transaction")?;

        debug!(
            "Applied batch: {} updates, {} inserts, {} deletes",
            updates.len(),
            inserts.len(),
            delete_ids.len()
        );
        Ok(new_ids)
    }

    /// Direct pool access for tests that need to run SQL the API does not
    /// expose, such as corrupting rows or dropping tables.
    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .context("Failed to parse SQLite connection string")?
        .create_if_missing(create);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(StoreError::classify)
        .with_context(|| format!("Unable to open SQLite database at {}", path.display()))
}

async fn acquire(pool: &SqlitePool) -> Result<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
    pool.acquire()
        .await
        .map_err(StoreError::classify)
        .context("Unable to acquire a database connection")
}

async fn current_version(pool: &SqlitePool) -> Result<i32> {
    let row: (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(StoreError::classify)
        .context("Failed to read the database schema version")?;
    Ok(row.0)
}

async fn insert_row(conn: &mut SqliteConnection, purchase: &Purchase) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO purchases (description, price, year, month) VALUES (?, ?, ?, ?)",
    )
    .bind(&purchase.description)
    .bind(purchase.price.to_string())
    .bind(&purchase.year)
    .bind(&purchase.month)
    .execute(&mut *conn)
    .await
    .map_err(StoreError::classify)?;
    Ok(result.last_insert_rowid())
}

async fn update_row(conn: &mut SqliteConnection, purchase: &Purchase) -> Result<()> {
    let result = sqlx::query("UPDATE purchases SET description = ?, price = ? WHERE id = ?")
        .bind(&purchase.description)
        .bind(purchase.price.to_string())
        .bind(purchase.id)
        .execute(&mut *conn)
        .await
        .map_err(StoreError::classify)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(purchase.id).into());
    }
    Ok(())
}

async fn delete_row(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM purchases WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(StoreError::classify)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(id).into());
    }
    Ok(())
}

fn purchase_from_row(row: &SqliteRow) -> Result<Purchase> {
    let price_text: String = row.try_get("price")?;
    let price = Decimal::from_str(&price_text)
        .with_context(|| format!("Invalid price '{price_text}' stored in the database"))?;
    Ok(Purchase {
        id: row.try_get("id")?,
        description: row.try_get("description")?,
        price,
        year: row.try_get("year")?,
        month: row.try_get("month")?,
    })
}

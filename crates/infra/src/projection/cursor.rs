//! Durable per-shard projection cursors.
//!
//! A cursor records the last shard position whose fold has completed. On
//! restart a projector resumes strictly after its cursor, so an event is
//! redelivered only if the process died between fold and cursor advance.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sqlx::{PgPool, Row};
use thiserror::Error;
use tokio::runtime::Handle;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("cursor store unavailable: {0}")]
    Unavailable(String),
}

pub trait CursorStore: Send + Sync {
    /// Last completed shard position for `(projection, shard)`. Zero if the
    /// cursor has never been advanced.
    fn load(&self, projection: &str, shard: u32) -> Result<u64, CursorError>;

    /// Record that every event up to and including `position` has folded.
    fn advance(&self, projection: &str, shard: u32, position: u64) -> Result<(), CursorError>;

    /// Forget all cursors for `projection` (full rebuild).
    fn clear(&self, projection: &str) -> Result<(), CursorError>;
}

impl<C: CursorStore + ?Sized> CursorStore for Arc<C> {
    fn load(&self, projection: &str, shard: u32) -> Result<u64, CursorError> {
        (**self).load(projection, shard)
    }

    fn advance(&self, projection: &str, shard: u32, position: u64) -> Result<(), CursorError> {
        (**self).advance(projection, shard, position)
    }

    fn clear(&self, projection: &str) -> Result<(), CursorError> {
        (**self).clear(projection)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    inner: RwLock<HashMap<(String, u32), u64>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for InMemoryCursorStore {
    fn load(&self, projection: &str, shard: u32) -> Result<u64, CursorError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| CursorError::Unavailable("lock poisoned".to_string()))?;
        Ok(guard
            .get(&(projection.to_string(), shard))
            .copied()
            .unwrap_or(0))
    }

    fn advance(&self, projection: &str, shard: u32, position: u64) -> Result<(), CursorError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| CursorError::Unavailable("lock poisoned".to_string()))?;
        guard.insert((projection.to_string(), shard), position);
        Ok(())
    }

    fn clear(&self, projection: &str) -> Result<(), CursorError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| CursorError::Unavailable("lock poisoned".to_string()))?;
        guard.retain(|(name, _), _| name != projection);
        Ok(())
    }
}

/// Cursors persisted in a `projection_offsets` table.
pub struct PostgresCursorStore {
    pool: Arc<PgPool>,
    handle: Handle,
}

impl PostgresCursorStore {
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self {
            pool: Arc::new(pool),
            handle,
        }
    }

    /// Create the offsets table if it does not exist.
    pub fn ensure_schema(&self) -> Result<(), CursorError> {
        let pool = self.pool.clone();
        self.handle
            .block_on(async move {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS projection_offsets (
                        projection_name TEXT NOT NULL,
                        shard           INT NOT NULL,
                        last_position   BIGINT NOT NULL,
                        updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                        PRIMARY KEY (projection_name, shard)
                    )
                    "#,
                )
                .execute(&*pool)
                .await
            })
            .map_err(|e| CursorError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

impl CursorStore for PostgresCursorStore {
    fn load(&self, projection: &str, shard: u32) -> Result<u64, CursorError> {
        let pool = self.pool.clone();
        let projection = projection.to_string();

        let row = self
            .handle
            .block_on(async move {
                sqlx::query(
                    r#"
                    SELECT last_position
                    FROM projection_offsets
                    WHERE projection_name = $1 AND shard = $2
                    "#,
                )
                .bind(&projection)
                .bind(shard as i32)
                .fetch_optional(&*pool)
                .await
            })
            .map_err(|e| CursorError::Unavailable(e.to_string()))?;

        match row {
            Some(row) => {
                let position: i64 = row
                    .try_get("last_position")
                    .map_err(|e| CursorError::Unavailable(e.to_string()))?;
                Ok(position as u64)
            }
            None => Ok(0),
        }
    }

    fn advance(&self, projection: &str, shard: u32, position: u64) -> Result<(), CursorError> {
        let pool = self.pool.clone();
        let projection = projection.to_string();

        self.handle
            .block_on(async move {
                sqlx::query(
                    r#"
                    INSERT INTO projection_offsets (projection_name, shard, last_position)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (projection_name, shard)
                    DO UPDATE SET
                        last_position = EXCLUDED.last_position,
                        updated_at = NOW()
                    "#,
                )
                .bind(&projection)
                .bind(shard as i32)
                .bind(position as i64)
                .execute(&*pool)
                .await
            })
            .map_err(|e| CursorError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn clear(&self, projection: &str) -> Result<(), CursorError> {
        let pool = self.pool.clone();
        let projection = projection.to_string();

        self.handle
            .block_on(async move {
                sqlx::query("DELETE FROM projection_offsets WHERE projection_name = $1")
                    .bind(&projection)
                    .execute(&*pool)
                    .await
            })
            .map_err(|e| CursorError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

//! Durable chunk queue on `import_chunk_queue`
//!
//! Messages are claimed with `FOR UPDATE SKIP LOCKED`, so any number of
//! worker processes can share one queue. A claimed message that is neither
//! acked nor nacked becomes visible again after the visibility timeout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::config::QueueConfig;
use crate::import::bus::{ChunkBus, Delivery};
use crate::import::types::ImportChunk;

#[derive(Clone)]
pub struct PgChunkQueue {
    pool: PgPool,
    config: QueueConfig,
}

impl PgChunkQueue {
    pub fn new(pool: PgPool, config: QueueConfig) -> Self {
        Self { pool, config }
    }

    /// Claim the oldest visible message, if any
    pub async fn try_claim(&self) -> Result<Option<Delivery>> {
        loop {
            let row: Option<(i64, i32, serde_json::Value)> = sqlx::query_as(
                r#"
                UPDATE import_chunk_queue
                SET claimed_at = NOW(), attempts = attempts + 1
                WHERE id = (
                    SELECT id FROM import_chunk_queue
                    WHERE routing_key = $1
                      AND (claimed_at IS NULL
                           OR claimed_at < NOW() - make_interval(secs => $2))
                    ORDER BY id
                    LIMIT 1
                    FOR UPDATE SKIP LOCKED
                )
                RETURNING id, attempts, payload
                "#,
            )
            .bind(&self.config.routing_key)
            .bind(self.config.visibility_timeout().as_secs_f64())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to claim chunk message")?;

            let Some((id, attempts, payload)) = row else {
                return Ok(None);
            };

            match serde_json::from_value::<ImportChunk>(payload) {
                Ok(chunk) => {
                    return Ok(Some(Delivery {
                        id: Some(id),
                        attempts,
                        chunk,
                    }))
                },
                Err(e) => {
                    tracing::error!(message_id = id, error = %e, "Discarding undecodable chunk message");
                    self.delete(id).await?;
                },
            }
        }
    }

    /// Messages waiting or in flight for this routing key
    pub async fn depth(&self) -> Result<i64> {
        let (depth,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM import_chunk_queue WHERE routing_key = $1")
                .bind(&self.config.routing_key)
                .fetch_one(&self.pool)
                .await
                .context("Failed to read queue depth")?;
        Ok(depth)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM import_chunk_queue WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete chunk message")?;
        Ok(())
    }
}

#[async_trait]
impl ChunkBus for PgChunkQueue {
    async fn publish(&self, chunk: &ImportChunk) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO import_chunk_queue (routing_key, job_id, chunk_number, payload)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&self.config.routing_key)
        .bind(chunk.job_id)
        .bind(chunk.chunk_number)
        .bind(Json(chunk))
        .execute(&self.pool)
        .await
        .context("Failed to publish chunk message")?;

        Ok(())
    }

    /// Poll until a message is available; never returns `None`
    async fn receive(&self) -> Result<Option<Delivery>> {
        loop {
            if let Some(delivery) = self.try_claim().await? {
                return Ok(Some(delivery));
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        match delivery.id {
            Some(id) => self.delete(id).await,
            None => Ok(()),
        }
    }

    async fn nack(&self, delivery: &Delivery, reason: &str) -> Result<()> {
        let Some(id) = delivery.id else {
            return Ok(());
        };
        sqlx::query(
            r#"
            UPDATE import_chunk_queue
            SET claimed_at = NULL, last_error = $1
            WHERE id = $2
            "#,
        )
        .bind(inventory_common::text::bounded_error_message(reason))
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to release chunk message")?;

        Ok(())
    }
}

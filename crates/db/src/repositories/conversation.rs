use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use concierge_core::collab::{ConversationStore, StoreError};
use concierge_core::domain::{ConversationKey, ConversationState, FlowState};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlConversationStateRepository {
    pool: DbPool,
}

impl SqlConversationStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                property_id,
                conversation_id,
                paused,
                resume_at,
                escalated,
                watch_mode,
                clarify_attempts,
                negative_count,
                service_flow_json,
                created_at,
                updated_at
             FROM conversation_state
             WHERE property_id = ? AND conversation_id = ?",
        )
        .bind(&key.property_id.0)
        .bind(&key.conversation_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(state_from_row).transpose()
    }

    pub async fn save(&self, state: &ConversationState) -> Result<(), RepositoryError> {
        let flow_json = state
            .service_flow
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO conversation_state (
                property_id,
                conversation_id,
                paused,
                resume_at,
                escalated,
                watch_mode,
                clarify_attempts,
                negative_count,
                service_flow_json,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(property_id, conversation_id) DO UPDATE SET
                paused = excluded.paused,
                resume_at = excluded.resume_at,
                escalated = excluded.escalated,
                watch_mode = excluded.watch_mode,
                clarify_attempts = excluded.clarify_attempts,
                negative_count = excluded.negative_count,
                service_flow_json = excluded.service_flow_json,
                updated_at = excluded.updated_at",
        )
        .bind(&state.key.property_id.0)
        .bind(&state.key.conversation_id.0)
        .bind(state.paused)
        .bind(state.resume_at.map(|value| value.to_rfc3339()))
        .bind(state.escalated)
        .bind(state.watch_mode)
        .bind(i64::from(state.clarify_attempts))
        .bind(i64::from(state.negative_count))
        .bind(flow_json)
        .bind(state.created_at.to_rfc3339())
        .bind(state.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The atomic half of "escalate at most once": the conditional UPDATE
    /// only matches while `escalated` is still 0, so exactly one of any
    /// number of concurrent callers observes a row change.
    pub async fn flip_escalated(&self, key: &ConversationKey) -> Result<bool, RepositoryError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT OR IGNORE INTO conversation_state (
                property_id, conversation_id, created_at, updated_at
             ) VALUES (?, ?, ?, ?)",
        )
        .bind(&key.property_id.0)
        .bind(&key.conversation_id.0)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let result = sqlx::query(
            "UPDATE conversation_state
             SET escalated = 1, updated_at = ?
             WHERE property_id = ? AND conversation_id = ? AND escalated = 0",
        )
        .bind(&now)
        .bind(&key.property_id.0)
        .bind(&key.conversation_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn expired_paused(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ConversationState>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                property_id,
                conversation_id,
                paused,
                resume_at,
                escalated,
                watch_mode,
                clarify_attempts,
                negative_count,
                service_flow_json,
                created_at,
                updated_at
             FROM conversation_state
             WHERE paused = 1 AND resume_at IS NOT NULL AND resume_at <= ?
             ORDER BY resume_at ASC
             LIMIT ?",
        )
        .bind(now.to_rfc3339())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(state_from_row).collect()
    }
}

#[async_trait::async_trait]
impl ConversationStore for SqlConversationStateRepository {
    async fn load(&self, key: &ConversationKey) -> Result<Option<ConversationState>, StoreError> {
        self.find(key).await.map_err(backend)
    }

    async fn upsert(&self, state: &ConversationState) -> Result<(), StoreError> {
        self.save(state).await.map_err(backend)
    }

    async fn mark_escalated_once(&self, key: &ConversationKey) -> Result<bool, StoreError> {
        self.flip_escalated(key).await.map_err(backend)
    }

    async fn list_expired_paused(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ConversationState>, StoreError> {
        self.expired_paused(now, limit).await.map_err(backend)
    }
}

fn backend(error: RepositoryError) -> StoreError {
    StoreError::Backend(error.to_string())
}

fn state_from_row(row: SqliteRow) -> Result<ConversationState, RepositoryError> {
    let service_flow: Option<FlowState> = row
        .get::<Option<String>, _>("service_flow_json")
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| RepositoryError::Decode(format!("service_flow_json: {e}")))?;

    Ok(ConversationState {
        key: ConversationKey::new(
            row.get::<String, _>("property_id"),
            row.get::<String, _>("conversation_id"),
        ),
        paused: row.get::<bool, _>("paused"),
        resume_at: row
            .get::<Option<String>, _>("resume_at")
            .map(|value| parse_timestamp(&value, "resume_at"))
            .transpose()?,
        escalated: row.get::<bool, _>("escalated"),
        watch_mode: row.get::<bool, _>("watch_mode"),
        clarify_attempts: row.get::<i64, _>("clarify_attempts") as u32,
        negative_count: row.get::<i64, _>("negative_count") as u32,
        service_flow,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"), "created_at")?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"), "updated_at")?,
    })
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

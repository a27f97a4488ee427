use chrono::Utc;
use sqlx::Row;
use tracing::warn;

use concierge_core::collab::SettingsProvider;
use concierge_core::domain::PropertySettings;

use super::RepositoryError;
use crate::DbPool;

/// Per-property settings stored as a JSON blob, falling back to the
/// configured defaults for properties without a row (or with a row that no
/// longer deserializes after a schema change).
pub struct SqlSettingsProvider {
    pool: DbPool,
    defaults: PropertySettings,
}

impl SqlSettingsProvider {
    pub fn new(pool: DbPool, defaults: PropertySettings) -> Self {
        Self { pool, defaults }
    }

    pub async fn save(
        &self,
        property_id: &str,
        settings: &PropertySettings,
    ) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(settings)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO property_settings (property_id, settings_json, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(property_id) DO UPDATE SET
                settings_json = excluded.settings_json,
                updated_at = excluded.updated_at",
        )
        .bind(property_id)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, property_id: &str) -> Result<Option<PropertySettings>, RepositoryError> {
        let row = sqlx::query(
            "SELECT settings_json FROM property_settings WHERE property_id = ?",
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            serde_json::from_str(&row.get::<String, _>("settings_json"))
                .map_err(|e| RepositoryError::Decode(format!("settings_json: {e}")))
        })
        .transpose()
    }
}

#[async_trait::async_trait]
impl SettingsProvider for SqlSettingsProvider {
    async fn settings_for(&self, property_id: &str) -> PropertySettings {
        match self.find(property_id).await {
            Ok(Some(settings)) => settings,
            Ok(None) => self.defaults.clone(),
            Err(error) => {
                warn!(
                    event_name = "settings.lookup_failed",
                    property_id,
                    error = %error,
                    "falling back to default property settings"
                );
                self.defaults.clone()
            }
        }
    }
}

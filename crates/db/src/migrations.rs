use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::{run_pending, MIGRATOR};
    use crate::connect_with_settings;

    /// Tables and indexes owned by the migration set, in sqlite_master terms.
    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "conversation_state",
        "property_settings",
        "idx_conversation_state_paused_resume_at",
    ];

    async fn fresh_pool() -> crate::DbPool {
        connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect")
    }

    /// (type, name, sql) triples for the objects this crate manages.
    async fn managed_signature(pool: &crate::DbPool) -> Vec<(String, String, String)> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT type, name, IFNULL(sql, '') FROM sqlite_master
             WHERE type IN ('table', 'index') ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects");

        rows.into_iter()
            .filter(|(_, name, _)| MANAGED_SCHEMA_OBJECTS.contains(&name.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn fresh_database_gets_the_full_schema() {
        let pool = fresh_pool().await;
        run_pending(&pool).await.expect("run migrations");

        let names: Vec<String> =
            managed_signature(&pool).await.into_iter().map(|(_, name, _)| name).collect();
        for object in MANAGED_SCHEMA_OBJECTS {
            assert!(names.iter().any(|n| n == object), "{object} should exist after migration");
        }
    }

    #[tokio::test]
    async fn full_undo_removes_everything_the_migrations_created() {
        let pool = fresh_pool().await;
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        assert!(managed_signature(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn up_down_up_is_schema_stable() {
        let pool = fresh_pool().await;
        run_pending(&pool).await.expect("run migrations");
        let first = managed_signature(&pool).await;
        assert_eq!(first.len(), MANAGED_SCHEMA_OBJECTS.len());

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        run_pending(&pool).await.expect("re-run migrations");

        assert_eq!(managed_signature(&pool).await, first);
    }
}

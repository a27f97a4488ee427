use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use concierge_channel::{PlatformClient, PlatformClientConfig};
use concierge_core::collab::memory::{CannedSmalltalk, NoopExtractor};
use concierge_core::collab::SlotExtractor;
use concierge_core::config::{AppConfig, ConfigError, LoadOptions};
use concierge_core::{Collaborators, DialogEngine, EscalationEngine, Router};
use concierge_db::{
    connect_with_settings, migrations, DbPool, SqlConversationStateRepository, SqlSettingsProvider,
};
use concierge_extract::{BookingExtractor, ExtractorConfig, HttpLlmClient};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub router: Arc<Router>,
    pub escalation: Arc<EscalationEngine>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("platform client failed to initialize: {0}")]
    Platform(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let platform = Arc::new(
        PlatformClient::new(PlatformClientConfig {
            base_url: config.platform.base_url.clone(),
            api_token: config.platform.api_token.clone(),
            bot_tag: config.platform.bot_tag.clone(),
            timeout_secs: 10,
        })
        .map_err(|e| BootstrapError::Platform(e.to_string()))?,
    );

    let store = Arc::new(SqlConversationStateRepository::new(db_pool.clone()));
    let settings =
        Arc::new(SqlSettingsProvider::new(db_pool.clone(), config.defaults.clone()));

    let collab = Collaborators {
        store: store.clone(),
        replies: platform.clone(),
        notifier: platform.clone(),
        platform: platform.clone(),
        faq: platform.clone(),
        settings,
        smalltalk: Arc::new(CannedSmalltalk),
        extractor: build_extractor(&config),
    };

    let router = Arc::new(Router::new(collab, DialogEngine::default()));
    let escalation = Arc::new(EscalationEngine::new(store, platform.clone(), platform));

    Ok(Application { config, db_pool, router, escalation })
}

fn build_extractor(config: &AppConfig) -> Arc<dyn SlotExtractor> {
    let extract = &config.extract;
    if !extract.enabled {
        return Arc::new(NoopExtractor);
    }

    let (Some(base_url), Some(api_key)) = (extract.base_url.clone(), extract.api_key.clone())
    else {
        info!(
            event_name = "system.bootstrap.extract_disabled",
            "extraction enabled but endpoint or key missing, running without hints"
        );
        return Arc::new(NoopExtractor);
    };

    match HttpLlmClient::new(base_url, api_key, extract.model.clone(), extract.timeout_secs) {
        Ok(llm) => Arc::new(BookingExtractor::new(
            Arc::new(llm),
            ExtractorConfig {
                timeout: Duration::from_secs(extract.timeout_secs.max(1)),
                min_confidence: extract.min_confidence,
            },
        )),
        Err(error) => {
            info!(
                event_name = "system.bootstrap.extract_disabled",
                error = %error,
                "extraction client failed to build, running without hints"
            );
            Arc::new(NoopExtractor)
        }
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    #[tokio::test]
    async fn bootstrap_runs_migrations_against_in_memory_database() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                platform_api_token: Some("token-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('conversation_state', 'property_settings')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 2, "bootstrap should create the conversation schema");
    }
}

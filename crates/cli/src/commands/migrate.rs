use crate::commands::CommandResult;
use concierge_core::config::{AppConfig, LoadOptions};
use concierge_db::{connect_with_settings, migrations};

/// Exit codes double as an error taxonomy for scripts: 2 config, 3 runtime,
/// 4 connectivity, 5 migration.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure(
                    "migrate",
                    "db_connectivity",
                    error.to_string(),
                    4,
                );
            }
        };

        let applied = migrations::run_pending(&pool).await;
        pool.close().await;

        match applied {
            Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
            Err(error) => CommandResult::failure("migrate", "migration", error.to_string(), 5),
        }
    })
}

use thiserror::Error;

pub mod conversation;
pub mod settings;

pub use conversation::SqlConversationStateRepository;
pub use settings::SqlSettingsProvider;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

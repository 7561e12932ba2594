use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallycastError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Database unavailable after {attempts} connection attempts")]
    StoreUnavailable { attempts: u32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TallycastError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Pricing source error: {0}")] Source(String),

    #[error("Storage error: {0}")] Storage(String),

    #[error("Serialization error: {0}")] Serde(#[from] serde_json::Error),

    #[error("Invalid input: {0}")] InvalidInput(String),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

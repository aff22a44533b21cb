use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// The submitted URL is not a recognizable sound link.
    #[error("not a valid sound link")]
    InvalidLink,

    #[error("notification delivery failed: {0}")]
    Notification(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShieldError>;

#[derive(Debug, Error)]
pub enum ShieldError {
    #[error("no credential configured for the rewriting service")]
    MissingCredential,
    /// Surfaced verbatim so the caller sees the service's own message.
    #[error(transparent)]
    DelegatedServiceFailure(#[from] crate::delegate::DelegateError),
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("settings error: {0}")]
    Settings(#[from] crate::settings::SettingsError),
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("other error: {0}")]
    Other(String),
}

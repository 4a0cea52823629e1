use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn {name}: {source}")]
    Spawn { name: String, #[source] source: std::io::Error },
    #[error("webhook post failed: {0}")]
    Webhook(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MedMinderError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid time spec: {0}")]
    InvalidTimeSpec(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, MedMinderError>;

use crate::query::error::QueryErr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("parse error: {0}")]
    Parse(#[from] QueryErr),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("computation error: {0}")]
    Computation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("power meter error: {0}")]
    Power(String),
}

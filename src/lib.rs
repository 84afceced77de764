use thiserror::Error;

pub type Result<T> = std::result::Result<T, LensError>;

#[derive(Error, Debug)]
pub enum LensError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    Service(#[from] analysis::ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod analysis;
pub mod commands;
pub mod config;
pub mod document;
pub mod highlight;
pub mod inspector;
pub mod similarity;
pub mod text;

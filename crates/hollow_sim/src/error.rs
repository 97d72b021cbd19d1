//! Simulation errors

use thiserror::Error;

/// Errors raised while loading or running a scenario
#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("AI setup failed: {0}")]
    Ai(#[from] hollow_ai::AiError),
}

impl SimError {
    pub(crate) fn scenario(msg: impl Into<String>) -> Self {
        SimError::Scenario(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

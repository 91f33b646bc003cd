//! Error types for the show controller.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShowError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// OSC encode/decode failure
    #[error("OSC error: {0}")]
    Osc(String),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// GPIO line could not be exported, configured or read
    #[error("GPIO {pin}: {source}")]
    Gpio {
        pin: u32,
        #[source]
        source: io::Error,
    },
}

impl From<rosc::OscError> for ShowError {
    fn from(e: rosc::OscError) -> Self {
        ShowError::Osc(format!("{:?}", e))
    }
}

pub type Result<T> = std::result::Result<T, ShowError>;

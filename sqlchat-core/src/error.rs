use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum SqlChatError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

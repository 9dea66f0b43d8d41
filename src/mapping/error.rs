//! Error definitions for the mapping module.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// Engine could not be brought up.
    #[error("initialization error: {0}")]
    InitializationError(String),

    /// Channel to or from the engine task broke.
    #[error("channel error: {0}")]
    ChannelError(String),

    /// Engine task management failure.
    #[error("thread error: {0}")]
    ThreadError(String),

    /// Event could not be processed.
    #[error("processing error: {0}")]
    ProcessingError(String),
}

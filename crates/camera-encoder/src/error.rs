//! Error types for the encoder module.

use thiserror::Error;

/// Errors that can occur during encoding operations.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// The video output could not be created.
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// General encoding error.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Image serialization error.
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid input data.
    #[error("Invalid input data: {0}")]
    InvalidInput(String),

    /// Finalizing the output failed.
    #[error("Finalize failed: {0}")]
    FinishFailed(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

use std::io;
use thiserror::Error;

/// Errors from loading, normalizing and encoding replacement icons.
#[derive(Debug, Error)]
pub enum IconError {
    /// The image cannot be used: undecodable, not square, or blank
    #[error("invalid source image {image}: {reason}")]
    InvalidSource { image: String, reason: String },
    /// A vector image was supplied but no vector renderer is available
    #[error("cannot render {image}: {capability} is not available in this build")]
    CapabilityUnavailable {
        image: String,
        capability: &'static str,
    },
    /// The encoder rejected a normalized buffer
    #[error("failed to encode '{target}': {reason}")]
    Encoding { target: String, reason: String },
    /// The target table is malformed
    #[error("invalid target table: {reason}")]
    InvalidTargets { reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl IconError {
    pub(crate) fn invalid(image: impl Into<String>, reason: impl Into<String>) -> Self {
        IconError::InvalidSource {
            image: image.into(),
            reason: reason.into(),
        }
    }
}

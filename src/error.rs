//! Error types for plandoc library.

use std::io;
use thiserror::Error;

/// Result type alias for plandoc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while encoding, paginating or exporting a plan.
///
/// Malformed inline markup is deliberately absent: the codec always recovers
/// from it and only logs the degradation.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document tree does not have the expected shape.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A measurement element never appeared in the render context.
    #[error("Layout timeout: element '{element}' not ready after {waited_ms} ms")]
    LayoutTimeout {
        /// DOM id of the element that was awaited
        element: String,
        /// How long the context waited
        waited_ms: u64,
    },

    /// An image could not be fetched or decoded.
    #[error("Image resource error: {0}")]
    ImageResource(String),

    /// Section save/load failed in the transport collaborator.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Error while rendering or rasterizing a page.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Error while assembling the PDF output.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Error decoding or encoding raster data.
    #[error("Raster error: {0}")]
    Raster(String),

    /// No section with the given identifier.
    #[error("Unknown section: {0}")]
    UnknownSection(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Pdf(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Raster(err.to_string())
    }
}

impl Error {
    /// Whether the caller may reasonably retry the operation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::LayoutTimeout { .. } | Error::ImageResource(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::LayoutTimeout {
            element: "item-0-1".to_string(),
            waited_ms: 2000,
        };
        assert_eq!(
            err.to_string(),
            "Layout timeout: element 'item-0-1' not ready after 2000 ms"
        );

        let err = Error::UnknownSection("problem".to_string());
        assert_eq!(err.to_string(), "Unknown section: problem");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_transient() {
        assert!(Error::Transport("503".into()).is_transient());
        assert!(!Error::InvalidDocument("root".into()).is_transient());
    }
}

//! Core error types for framecast.

/// A specialized Result type for framecast operations.
pub type FramecastResult<T> = Result<T, FramecastError>;

/// Top-level error type shared by the foreground and background crates.
#[derive(Debug, thiserror::Error)]
pub enum FramecastError {
    /// The surface's drawing rights have been moved to an offscreen handle.
    #[error("surface drawing rights were transferred to an offscreen handle")]
    SurfaceTransferred,

    #[error("renderer already owns a surface; refusing a second handle")]
    SurfaceAlreadyReceived,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("missing document element: {selector}")]
    MissingElement { selector: String },

    #[error("render error: {0}")]
    Render(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl FramecastError {
    /// Create a missing-element error for a selector that did not resolve.
    pub fn missing_element(selector: impl Into<String>) -> Self {
        FramecastError::MissingElement {
            selector: selector.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        FramecastError::InvalidState(message.into())
    }
}

impl From<toml::de::Error> for FramecastError {
    fn from(err: toml::de::Error) -> Self {
        FramecastError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FramecastError {
    fn from(err: toml::ser::Error) -> Self {
        FramecastError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_element_display() {
        let err = FramecastError::missing_element("video#my-video");
        assert_eq!(err.to_string(), "missing document element: video#my-video");
    }

    #[test]
    fn test_transferred_display() {
        let err = FramecastError::SurfaceTransferred;
        assert!(err.to_string().contains("transferred"));
    }

    #[test]
    fn test_config_error_from_toml() {
        let parsed: Result<toml::Table, _> = toml::from_str("not = [valid");
        let err: FramecastError = parsed.unwrap_err().into();
        assert!(matches!(err, FramecastError::Config(_)));
    }
}

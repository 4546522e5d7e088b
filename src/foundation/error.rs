use thiserror::Error;

/// Crate-wide error type.
///
/// Variants mirror the failure domains of a render: session negotiation with
/// the collaborating server, bounded resource fetches, media decoding, frame
/// upload, local rasterization, and input validation. Anything else funnels
/// through [`VideogenError::Other`].
#[derive(Debug, Error)]
pub enum VideogenError {
    /// The server rejected or lost a render session.
    #[error("session error: {0}")]
    Session(String),

    /// A bounded resource fetch exceeded its deadline.
    #[error("resource timeout: {0}")]
    Timeout(String),

    /// Audio, image, or video bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame batch could not be delivered.
    #[error("upload error: {0}")]
    Upload(String),

    /// Local rasterization failed.
    #[error("render error: {0}")]
    Render(String),

    /// Caller-supplied input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VideogenError {
    /// Construct a [`VideogenError::Session`].
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Construct a [`VideogenError::Timeout`].
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Construct a [`VideogenError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Construct a [`VideogenError::Upload`].
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Construct a [`VideogenError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Construct a [`VideogenError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type VideogenResult<T> = Result<T, VideogenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_domain_prefix() {
        assert_eq!(
            VideogenError::session("expired").to_string(),
            "session error: expired"
        );
        assert_eq!(
            VideogenError::timeout("audio fetch").to_string(),
            "resource timeout: audio fetch"
        );
        assert_eq!(
            VideogenError::validation("fps must be positive").to_string(),
            "validation error: fps must be positive"
        );
    }

    #[test]
    fn anyhow_conversion_is_transparent() {
        let err: VideogenError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}

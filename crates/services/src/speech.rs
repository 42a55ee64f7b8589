//! Speech-to-text collaborator.
//!
//! The session only ever needs "captured audio in, one final transcript
//! out". Recognition itself is platform-provided, so it stays behind a trait
//! and the default implementation reports the capability as missing.

use async_trait::async_trait;
use shared::error::ResourceError;

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Produce a single final transcript from a finished recording.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, ResourceError>;
}

/// Stand-in used when no recognition engine is wired up.
pub struct UnsupportedRecognizer;

#[async_trait]
impl SpeechRecognizer for UnsupportedRecognizer {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String, ResourceError> {
        Err(ResourceError::Recognition(
            "speech recognition is not available on this platform".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_recognizer_reports_missing_capability() {
        let err = UnsupportedRecognizer.transcribe(b"audio").await.unwrap_err();
        assert!(matches!(err, ResourceError::Recognition(_)));
    }
}

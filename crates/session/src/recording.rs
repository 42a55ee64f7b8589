//! Microphone capture lifecycle.
//!
//! Capture is the one resource in the system with strict acquire/release
//! discipline: the device is held exclusively between start and stop, and
//! must be released on every path out, including drop without an explicit
//! stop (the navigate-away case).

use shared::error::ResourceError;

/// A live audio capture stream. Constructing one acquires the device;
/// `stop` releases it and hands back whatever was buffered.
pub trait CaptureSource: Send {
    fn stop(&mut self) -> Result<Vec<u8>, ResourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

/// Owns a capture stream between start and stop.
pub struct RecordingSession {
    source: Option<Box<dyn CaptureSource>>,
}

impl RecordingSession {
    pub fn start(source: Box<dyn CaptureSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Stop capture and return the recorded audio. Consumes the session so
    /// the stream cannot be reused after release.
    pub fn stop(mut self) -> Result<Vec<u8>, ResourceError> {
        match self.source.take() {
            Some(mut source) => source.stop(),
            None => Ok(Vec::new()),
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        // Dropped without stop(): still release the device.
        if let Some(mut source) = self.source.take() {
            let _ = source.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct MockCapture {
        released: Arc<AtomicBool>,
        audio: Vec<u8>,
    }

    impl CaptureSource for MockCapture {
        fn stop(&mut self) -> Result<Vec<u8>, ResourceError> {
            self.released.store(true, Ordering::SeqCst);
            Ok(std::mem::take(&mut self.audio))
        }
    }

    #[test]
    fn test_stop_releases_and_yields_audio() {
        let released = Arc::new(AtomicBool::new(false));
        let session = RecordingSession::start(Box::new(MockCapture {
            released: released.clone(),
            audio: vec![1, 2, 3],
        }));

        let audio = session.stop().unwrap();
        assert_eq!(audio, vec![1, 2, 3]);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_without_stop_still_releases() {
        let released = Arc::new(AtomicBool::new(false));
        let session = RecordingSession::start(Box::new(MockCapture {
            released: released.clone(),
            audio: Vec::new(),
        }));

        drop(session);
        assert!(released.load(Ordering::SeqCst));
    }
}

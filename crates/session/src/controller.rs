//! Headless UI state machine for the chat widget.
//!
//! Owns the rendered transcript, the input buffer, the single loading state,
//! and the inline error banner. Exactly one request may be pending at a
//! time: the input affordance reports disabled while `Pending`, and the
//! underlying [`ChatSession`] enforces the same contract structurally.

use services::decode::{decode_rows, SourceFormat};
use services::speech::SpeechRecognizer;
use shared::config::RuntimeConfig;
use shared::error::{ChatError, ResourceError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::bootstrap;
use crate::chat::ChatSession;
use crate::recording::{CaptureSource, RecordingSession, RecordingState};

/// Inline errors disappear on their own after this long.
pub const ERROR_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingDependencies,
    Ready,
    /// One request in flight; input is disabled.
    Pending,
    /// Dependencies never became ready. Permanent for this session.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    User,
    Assistant,
    System,
    Error,
}

/// One rendered line of the widget.
#[derive(Debug, Clone)]
pub struct DisplayMessage {
    pub kind: DisplayKind,
    pub text: String,
}

struct InlineError {
    text: String,
    shown_at: Instant,
}

pub struct SessionUi {
    phase: Phase,
    transcript: Vec<DisplayMessage>,
    input: String,
    inline_error: Option<InlineError>,
    session: Option<Arc<ChatSession>>,
    recognizer: Arc<dyn SpeechRecognizer>,
    recording: Option<RecordingSession>,
}

impl SessionUi {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            phase: Phase::Idle,
            transcript: Vec::new(),
            input: String::new(),
            inline_error: None,
            session: None,
            recognizer,
            recording: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transcript(&self) -> &[DisplayMessage] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Whether the send affordance accepts input right now.
    pub fn input_enabled(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// Whether the loading indicator is visible.
    pub fn loading(&self) -> bool {
        self.phase == Phase::Pending
    }

    pub fn inline_error(&self) -> Option<&str> {
        self.inline_error.as_ref().map(|e| e.text.as_str())
    }

    /// Drop the inline error once its display window has passed. Call from
    /// the render loop.
    pub fn tick(&mut self) {
        if let Some(err) = &self.inline_error {
            if err.shown_at.elapsed() >= ERROR_DISMISS_AFTER {
                self.inline_error = None;
            }
        }
    }

    /// Run the full startup sequence against an already-composed
    /// [`RuntimeConfig`] (config load and model binding proceed in their own
    /// tasks). Ends in `Ready` or, on dependency timeout, `Failed`.
    pub async fn bring_up(&mut self, config: &Arc<RuntimeConfig>) {
        self.phase = Phase::AwaitingDependencies;
        match bootstrap::initialize(config).await {
            Ok(session) => {
                self.session = Some(Arc::new(session));
                self.phase = Phase::Ready;
                self.push(DisplayKind::System, "AI chat is ready. Say hello!");
            }
            Err(err) => {
                warn!("bootstrap failed: {}", err);
                self.phase = Phase::Failed;
                self.push(
                    DisplayKind::Error,
                    format!("Chat is unavailable: {}. Reload to try again.", err),
                );
            }
        }
    }

    /// Submit whatever is in the input buffer. Empty input is a no-op; a
    /// submission while not `Ready` only raises the inline banner.
    pub async fn submit(&mut self) {
        let message = self.input.trim().to_string();
        if message.is_empty() {
            return;
        }
        if !self.input_enabled() {
            self.show_error(match self.phase {
                Phase::Pending => "Still waiting on the previous reply.",
                Phase::Failed => "Chat is disabled for this session.",
                _ => "Chat is not ready yet.",
            });
            return;
        }
        self.input.clear();
        self.push(DisplayKind::User, message.clone());

        let session = match self.session.clone() {
            Some(session) => session,
            None => return,
        };
        self.phase = Phase::Pending;
        let outcome = session.send_text(&message).await;
        self.phase = Phase::Ready;
        match outcome {
            Ok(reply) => self.push(DisplayKind::Assistant, reply),
            Err(err) => self.report_chat_error(err),
        }
    }

    /// Recording is orthogonal to the request lifecycle: it may start in any
    /// phase. The capture stream is owned until stop or drop.
    pub fn start_recording(&mut self, source: Box<dyn CaptureSource>) {
        if self.recording.is_none() {
            self.recording = Some(RecordingSession::start(source));
        }
    }

    pub fn recording_state(&self) -> RecordingState {
        if self.recording.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    /// Stop recording, transcribe, and submit the transcript as a voice
    /// message. Capture and recognition failures surface inline and leave
    /// the chat phase untouched.
    pub async fn finish_recording(&mut self) {
        let Some(recording) = self.recording.take() else {
            return;
        };
        let audio = match recording.stop() {
            Ok(audio) => audio,
            Err(err) => {
                self.report_resource_error(err);
                return;
            }
        };
        let transcript = match self.recognizer.transcribe(&audio).await {
            Ok(transcript) => transcript,
            Err(err) => {
                self.report_resource_error(err);
                return;
            }
        };
        if !self.input_enabled() {
            self.show_error("Chat is not ready yet.");
            return;
        }
        let session = match self.session.clone() {
            Some(session) => session,
            None => return,
        };
        self.push(DisplayKind::User, transcript.clone());
        self.phase = Phase::Pending;
        let outcome = session.send_audio_transcript(&transcript).await;
        self.phase = Phase::Ready;
        match outcome {
            Ok(reply) => self.push(DisplayKind::Assistant, reply),
            Err(err) => self.report_chat_error(err),
        }
    }

    /// Decode an uploaded file and route the generated analysis prompt into
    /// the session like a text message.
    pub async fn upload_file(&mut self, file_name: &str, bytes: &[u8]) {
        let extension = file_name.rsplit('.').next().unwrap_or_default();
        let Some(format) = SourceFormat::from_extension(extension) else {
            self.show_error(format!("Unsupported file type: {}", file_name));
            return;
        };
        let table = match decode_rows(bytes, format) {
            Ok(table) => table,
            Err(err) => {
                self.report_resource_error(err);
                return;
            }
        };
        self.push(
            DisplayKind::System,
            format!(
                "Loaded {}: {} rows x {} columns",
                file_name,
                table.row_count(),
                table.column_count()
            ),
        );

        if !self.input_enabled() {
            self.show_error("Chat is not ready yet; showing the file without analysis.");
            return;
        }
        let session = match self.session.clone() {
            Some(session) => session,
            None => return,
        };
        self.phase = Phase::Pending;
        let outcome = session.analyze_table(&table, format).await;
        self.phase = Phase::Ready;
        match outcome {
            Ok(report) => self.push(DisplayKind::Assistant, report),
            Err(err) => self.report_chat_error(err),
        }
    }

    fn report_chat_error(&mut self, err: ChatError) {
        self.show_error(format!("Sorry, I hit an error: {}", err));
    }

    fn report_resource_error(&mut self, err: ResourceError) {
        self.show_error(err.to_string());
    }

    fn show_error(&mut self, text: impl Into<String>) {
        self.inline_error = Some(InlineError {
            text: text.into(),
            shown_at: Instant::now(),
        });
    }

    fn push(&mut self, kind: DisplayKind, text: impl Into<String>) {
        self.transcript.push(DisplayMessage {
            kind,
            text: text.into(),
        });
    }
}

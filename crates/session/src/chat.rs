//! The chat session: conversation history plus serialized access to the
//! remote model.
//!
//! One session accepts one outstanding remote call at a time. The guard is
//! structural (an atomic flag released by RAII), so the contract holds even
//! if a caller bypasses the UI layer's disabled-input discipline.

use parking_lot::Mutex;
use providers::classify::classify_remote_error;
use services::decode::SourceFormat;
use services::tabular::{build_report, Table};
use shared::chat::ChatMessage;
use shared::error::{ChatError, InputError};
use shared::model_api::TextModel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const VOICE_CONTEXT: &str =
    "The user spoke this message aloud. Reply in a natural, conversational tone.";

pub struct ChatSession {
    model: Arc<dyn TextModel>,
    history: Mutex<Vec<ChatMessage>>,
    in_flight: AtomicBool,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession").finish_non_exhaustive()
    }
}

/// Clears the in-flight flag on every exit path.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ChatSession {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            history: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Send a typed message and return the assistant's reply.
    pub async fn send_text(&self, message: &str) -> Result<String, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(InputError::EmptyMessage.into());
        }
        let guard = self.begin_call()?;
        self.submit(guard, message.to_string(), message.to_string())
            .await
    }

    /// Send a voice transcript. The transcript itself goes into history; the
    /// prompt wraps it in a voice-context instruction so replies read
    /// conversationally.
    pub async fn send_audio_transcript(&self, transcript: &str) -> Result<String, ChatError> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(InputError::EmptyMessage.into());
        }
        let guard = self.begin_call()?;
        let prompt = format!("{}\n\n{}", VOICE_CONTEXT, transcript);
        self.submit(guard, transcript.to_string(), prompt).await
    }

    /// Analyze an uploaded table: the generated analysis prompt is submitted
    /// exactly like a typed message and recorded in history the same way.
    pub async fn analyze_table(
        &self,
        table: &Table,
        format: SourceFormat,
    ) -> Result<String, ChatError> {
        if table.rows.is_empty() {
            return Err(InputError::MissingField("table rows").into());
        }
        let guard = self.begin_call()?;
        let prompt = build_report(table, format.label());
        self.submit(guard, prompt.clone(), prompt).await
    }

    /// Resets the transcript. Idempotent; does not touch an in-flight call.
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin_call(&self) -> Result<FlightGuard<'_>, ChatError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        Ok(FlightGuard(&self.in_flight))
    }

    /// Policy: the user turn is recorded once validation passes, before the
    /// remote call; the assistant turn is recorded only on success.
    async fn submit(
        &self,
        _guard: FlightGuard<'_>,
        recorded: String,
        prompt: String,
    ) -> Result<String, ChatError> {
        self.history.lock().push(ChatMessage::user(recorded));
        match self.model.generate(&prompt).await {
            Ok(reply) => {
                self.history.lock().push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(err) => {
                let message = err.to_string();
                Err(ChatError::Remote {
                    kind: classify_remote_error(&message),
                    message,
                })
            }
        }
    }
}

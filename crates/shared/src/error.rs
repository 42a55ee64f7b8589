//! Closed error taxonomy for the session.
//!
//! Every error here is caught at the boundary of the user action that caused
//! it and rendered inline; nothing in this taxonomy is fatal to the process.

use thiserror::Error;

/// Category assigned to a failed remote model call.
///
/// The remote API reports failures as free text, so classification is a
/// best-effort substring match (see `providers::classify`). Kept as a closed
/// enum so a structured error code can slot in later without touching callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    InvalidCredential,
    QuotaExceeded,
    Unavailable,
    Unknown,
}

/// Startup failures.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The config fetch failed. Recovered via the hardcoded fallback, so
    /// callers only ever see this in the one-shot load notice.
    #[error("config fetch failed: {0}")]
    ConfigFetch(String),

    /// A dependency never became ready within its poll budget. Terminal for
    /// this session: the chat feature stays disabled until restart.
    #[error("{dependency} never became ready after {attempts} checks")]
    DependencyTimeout {
        dependency: &'static str,
        attempts: u32,
    },
}

/// Local validation failures; no remote call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("no account found for {0}")]
    UnknownAccount(String),
    #[error("wrong password")]
    WrongPassword,
}

/// Failures in local collaborators (capture devices, file decoding, speech).
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("microphone unavailable: {0}")]
    Microphone(String),
    #[error("could not decode {format} data: {message}")]
    Decode { format: &'static str, message: String },
    #[error("speech recognition failed: {0}")]
    Recognition(String),
}

/// Everything a chat session call can fail with.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("model call failed: {message}")]
    Remote {
        kind: RemoteErrorKind,
        message: String,
    },

    /// A call is already in flight; the session accepts one at a time.
    #[error("a request is already in flight")]
    Busy,

    #[error(transparent)]
    Input(#[from] InputError),
}

impl ChatError {
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            ChatError::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages_are_user_presentable() {
        let err = BootstrapError::DependencyTimeout {
            dependency: "configuration",
            attempts: 50,
        };
        assert_eq!(
            err.to_string(),
            "configuration never became ready after 50 checks"
        );

        let err = ChatError::Remote {
            kind: RemoteErrorKind::QuotaExceeded,
            message: "quota exceeded for project".into(),
        };
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::QuotaExceeded));
    }
}

//! Best-effort mapping from free-text model failures to a closed category set.
//!
//! The generative-language API does not return a structured error code, so
//! the only signal is the message text. Substring matching is brittle by
//! nature; it lives behind this one function so callers never depend on the
//! matching rules themselves.

use shared::error::RemoteErrorKind;

pub fn classify_remote_error(message: &str) -> RemoteErrorKind {
    let lower = message.to_lowercase();

    if lower.contains("api key")
        || lower.contains("api_key")
        || lower.contains("credential")
        || lower.contains("unauthorized")
        || lower.contains("permission denied")
    {
        return RemoteErrorKind::InvalidCredential;
    }

    if lower.contains("quota") || lower.contains("rate limit") || lower.contains("resource_exhausted")
    {
        return RemoteErrorKind::QuotaExceeded;
    }

    if lower.contains("unavailable") || lower.contains("overloaded") || lower.contains("503") {
        return RemoteErrorKind::Unavailable;
    }

    RemoteErrorKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors() {
        assert_eq!(
            classify_remote_error("API key not valid. Please pass a valid API key."),
            RemoteErrorKind::InvalidCredential
        );
        assert_eq!(
            classify_remote_error("401 Unauthorized"),
            RemoteErrorKind::InvalidCredential
        );
    }

    #[test]
    fn test_quota_errors() {
        assert_eq!(
            classify_remote_error("Quota exceeded for quota metric 'GenerateContent requests'"),
            RemoteErrorKind::QuotaExceeded
        );
        assert_eq!(
            classify_remote_error("RESOURCE_EXHAUSTED: rate limit hit"),
            RemoteErrorKind::QuotaExceeded
        );
    }

    #[test]
    fn test_unavailable_and_unknown() {
        assert_eq!(
            classify_remote_error("gemini error: 503 Service Unavailable"),
            RemoteErrorKind::Unavailable
        );
        assert_eq!(
            classify_remote_error("something else went wrong"),
            RemoteErrorKind::Unknown
        );
    }

    #[test]
    fn test_credential_takes_precedence_over_quota() {
        // A message naming both the key and a limit is an auth problem first.
        assert_eq!(
            classify_remote_error("API key over quota"),
            RemoteErrorKind::InvalidCredential
        );
    }
}

//! Runtime configuration state for the chat session.
//!
//! One `RuntimeConfig` is constructed at startup and handed by `Arc` to every
//! component that needs it; there is no ambient global. The credential slot
//! goes through an explicit lifecycle so readers can tell "not yet attempted"
//! from "attempted and failed" from "attempted but only a placeholder".

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model_api::TextModel;

/// The config key the whole feature hinges on.
pub const CREDENTIAL_KEY: &str = "GEMINI_API_KEY";

/// Sentinel the server returns when the environment never had a key.
pub const NOT_SET: &str = "not_set";

/// Sentinel a checked-out repo ships before anyone edits their env.
pub const PLACEHOLDER_KEY: &str = "your_api_key_here";

/// Lifecycle of the model credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    /// Load has not been attempted.
    Unloaded,
    /// Fetch in flight (the `"loading"` sentinel of the wire protocol).
    Loading,
    /// Fetch finished and produced a value. The value may still be a
    /// placeholder; see [`CredentialState::is_usable`].
    Ready(String),
    /// Fetch and fallback both failed (the `"error"` sentinel).
    Failed,
}

impl Default for CredentialState {
    fn default() -> Self {
        CredentialState::Unloaded
    }
}

impl CredentialState {
    /// True only for a real, non-placeholder key.
    pub fn is_usable(&self) -> bool {
        match self {
            CredentialState::Ready(key) => {
                !key.is_empty() && key != PLACEHOLDER_KEY && key != NOT_SET
            }
            _ => false,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            CredentialState::Ready(key) => Some(key.as_str()),
            _ => None,
        }
    }
}

/// Register-once slot for the model client binding.
///
/// This replaces the original design's "is the SDK global defined yet" check:
/// the host registers one concrete [`TextModel`] during composition, and
/// bootstrap readiness polls `is_bound()`.
#[derive(Default)]
pub struct ModelSlot {
    inner: RwLock<Option<Arc<dyn TextModel>>>,
}

impl ModelSlot {
    pub fn bind(&self, model: Arc<dyn TextModel>) {
        *self.inner.write() = Some(model);
    }

    pub fn is_bound(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn get(&self) -> Option<Arc<dyn TextModel>> {
        self.inner.read().clone()
    }
}

/// Shared runtime configuration, constructed once per process.
#[derive(Default)]
pub struct RuntimeConfig {
    values: RwLock<HashMap<String, String>>,
    credential: RwLock<CredentialState>,
    model: ModelSlot,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fetched config value. Storing under [`CREDENTIAL_KEY`] also
    /// advances the credential lifecycle to `Ready`.
    pub fn set_value(&self, key: &str, value: &str) {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        if key == CREDENTIAL_KEY {
            *self.credential.write() = CredentialState::Ready(value.to_string());
        }
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    pub fn set_credential(&self, state: CredentialState) {
        *self.credential.write() = state;
    }

    pub fn credential(&self) -> CredentialState {
        self.credential.read().clone()
    }

    /// Pure readiness test used by the bootstrap poller.
    pub fn credential_usable(&self) -> bool {
        self.credential.read().is_usable()
    }

    pub fn model(&self) -> &ModelSlot {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_not_usable() {
        assert!(!CredentialState::Unloaded.is_usable());
        assert!(!CredentialState::Loading.is_usable());
        assert!(!CredentialState::Failed.is_usable());
        assert!(!CredentialState::Ready(PLACEHOLDER_KEY.into()).is_usable());
        assert!(!CredentialState::Ready(NOT_SET.into()).is_usable());
        assert!(!CredentialState::Ready(String::new()).is_usable());
        assert!(CredentialState::Ready("AIza-real-key".into()).is_usable());
    }

    #[test]
    fn test_set_value_advances_credential() {
        let config = RuntimeConfig::new();
        assert_eq!(config.credential(), CredentialState::Unloaded);

        config.set_value("OTHER_KEY", "x");
        assert_eq!(config.credential(), CredentialState::Unloaded);

        config.set_value(CREDENTIAL_KEY, "secret");
        assert!(config.credential_usable());
        assert_eq!(config.value(CREDENTIAL_KEY).as_deref(), Some("secret"));
    }

    #[test]
    fn test_model_slot_binds_once_visible() {
        struct Fake;
        #[async_trait::async_trait]
        impl crate::model_api::TextModel for Fake {
            async fn generate(&self, _contents: &str) -> anyhow::Result<String> {
                Ok(String::new())
            }
        }

        let config = RuntimeConfig::new();
        assert!(!config.model().is_bound());
        config.model().bind(Arc::new(Fake));
        assert!(config.model().is_bound());
        assert!(config.model().get().is_some());
    }
}

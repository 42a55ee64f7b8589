//! Startup sequencing: load runtime configuration, wait for dependencies,
//! construct the chat session.
//!
//! Readiness is a bounded poll against the shared [`RuntimeConfig`]: the
//! credential lands via an async fetch and the model binding via a separate
//! composition task, and neither completion is observable synchronously from
//! here. Exhausting the poll budget is terminal for the session.

use parking_lot::Mutex;
use providers::gemini::{GeminiClient, DEFAULT_MODEL};
use shared::config::{CredentialState, RuntimeConfig, CREDENTIAL_KEY, NOT_SET, PLACEHOLDER_KEY};
use shared::error::BootstrapError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::chat::ChatSession;

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Credential wait budget: 50 checks at 100ms, about five seconds.
pub const CONFIG_WAIT_ATTEMPTS: u32 = 50;
/// Model-binding wait budget: 20 checks, about two seconds.
pub const MODEL_WAIT_ATTEMPTS: u32 = 20;

/// Degraded-mode default used when the config endpoint is unreachable.
/// Deliberately not a real key; the session will surface credential errors
/// on first use instead of failing bootstrap.
pub const FALLBACK_API_KEY: &str = "dev-local-fallback-key";

/// One-shot notification emitted when the config load settles.
#[derive(Debug)]
pub struct ConfigNotice {
    pub success: bool,
    pub keys: Vec<String>,
    pub error: Option<String>,
}

/// Fetches runtime configuration from the backend and publishes it into the
/// shared [`RuntimeConfig`]. Loading never fails: any fetch problem falls
/// back to [`FALLBACK_API_KEY`].
pub struct ConfigLoader {
    http: reqwest::Client,
    base_url: String,
    config: Arc<RuntimeConfig>,
    notice: Mutex<Option<oneshot::Sender<ConfigNotice>>>,
}

impl ConfigLoader {
    pub fn new(
        base_url: impl Into<String>,
        config: Arc<RuntimeConfig>,
    ) -> (Self, oneshot::Receiver<ConfigNotice>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                http: reqwest::Client::new(),
                base_url: base_url.into(),
                config,
                notice: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Load configuration from `{base_url}/api/config`.
    ///
    /// Returns the loaded key set; the credential may still be a placeholder
    /// (that is reported, not failed). At most one [`ConfigNotice`] is ever
    /// emitted, on the first completed load.
    pub async fn load(&self) -> HashMap<String, String> {
        self.config.set_credential(CredentialState::Loading);

        match self.fetch().await {
            Ok(values) => {
                for (key, value) in &values {
                    self.config.set_value(key, value);
                }
                match values.get(CREDENTIAL_KEY) {
                    Some(key) if key != NOT_SET && key != PLACEHOLDER_KEY && !key.is_empty() => {
                        info!("config loaded, credential present");
                    }
                    Some(_) => warn!("config loaded but {} is not set", CREDENTIAL_KEY),
                    None => warn!("config loaded without {}", CREDENTIAL_KEY),
                }
                self.emit(ConfigNotice {
                    success: true,
                    keys: values.keys().cloned().collect(),
                    error: None,
                });
                values
            }
            Err(err) => {
                warn!("config fetch failed ({}), using fallback credential", err);
                self.config.set_value(CREDENTIAL_KEY, FALLBACK_API_KEY);
                self.emit(ConfigNotice {
                    success: false,
                    keys: vec![CREDENTIAL_KEY.to_string()],
                    error: Some(err.to_string()),
                });
                HashMap::from([(CREDENTIAL_KEY.to_string(), FALLBACK_API_KEY.to_string())])
            }
        }
    }

    async fn fetch(&self) -> Result<HashMap<String, String>, BootstrapError> {
        let url = format!("{}/api/config", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BootstrapError::ConfigFetch(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BootstrapError::ConfigFetch(format!(
                "HTTP {}",
                resp.status()
            )));
        }
        resp.json::<HashMap<String, String>>()
            .await
            .map_err(|e| BootstrapError::ConfigFetch(e.to_string()))
    }

    fn emit(&self, notice: ConfigNotice) {
        if let Some(tx) = self.notice.lock().take() {
            let _ = tx.send(notice);
        }
    }
}

/// Poll `check` until it holds, up to `max_attempts` checks spaced by
/// `interval`. The check runs first on each iteration, so a condition that
/// never holds is tested exactly `max_attempts` times.
pub async fn wait_for_readiness<F>(
    mut check: F,
    dependency: &'static str,
    max_attempts: u32,
    interval: Duration,
) -> Result<(), BootstrapError>
where
    F: FnMut() -> bool,
{
    for attempt in 0..max_attempts {
        if check() {
            return Ok(());
        }
        if attempt + 1 < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(BootstrapError::DependencyTimeout {
        dependency,
        attempts: max_attempts,
    })
}

/// Composition task: once a usable credential lands, build the Gemini client
/// and bind it into the model slot. Runs independently of [`initialize`],
/// the way the SDK script load ran independently of the page logic.
pub fn spawn_default_binding(config: Arc<RuntimeConfig>) {
    tokio::spawn(async move {
        let ready = wait_for_readiness(
            || config.credential_usable(),
            "configuration",
            CONFIG_WAIT_ATTEMPTS,
            POLL_INTERVAL,
        )
        .await;
        if ready.is_err() {
            return;
        }
        match GeminiClient::from_config(DEFAULT_MODEL, &config) {
            Ok(client) => config.model().bind(Arc::new(client)),
            Err(err) => warn!("model binding failed: {}", err),
        }
    });
}

/// Wait for both dependencies and construct the session.
///
/// Order matters: the credential first (larger budget), then the model
/// binding. A timeout here disables the chat feature for this session.
pub async fn initialize(config: &Arc<RuntimeConfig>) -> Result<ChatSession, BootstrapError> {
    wait_for_readiness(
        || config.credential_usable(),
        "configuration",
        CONFIG_WAIT_ATTEMPTS,
        POLL_INTERVAL,
    )
    .await?;

    wait_for_readiness(
        || config.model().is_bound(),
        "model binding",
        MODEL_WAIT_ATTEMPTS,
        POLL_INTERVAL,
    )
    .await?;

    let model = config
        .model()
        .get()
        .ok_or(BootstrapError::DependencyTimeout {
            dependency: "model binding",
            attempts: MODEL_WAIT_ATTEMPTS,
        })?;
    info!("dependencies ready, chat session constructed");
    Ok(ChatSession::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_waiter_counts_exact_attempts_on_timeout() {
        let checks = AtomicUsize::new(0);
        let err = wait_for_readiness(
            || {
                checks.fetch_add(1, Ordering::SeqCst);
                false
            },
            "configuration",
            50,
            POLL_INTERVAL,
        )
        .await
        .unwrap_err();

        assert_eq!(checks.load(Ordering::SeqCst), 50);
        assert!(matches!(
            err,
            BootstrapError::DependencyTimeout {
                dependency: "configuration",
                attempts: 50
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_stops_polling_once_ready() {
        let checks = AtomicUsize::new(0);
        wait_for_readiness(
            || checks.fetch_add(1, Ordering::SeqCst) + 1 >= 3,
            "model binding",
            20,
            POLL_INTERVAL,
        )
        .await
        .unwrap();
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_load_stores_fetched_keys() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let body = r#"{"GEMINI_API_KEY":"AIza-live","EXTRA":"1"}"#;
            let resp = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = sock.write_all(resp.as_bytes()).await;
        });

        let config = Arc::new(RuntimeConfig::new());
        let (loader, notice) = ConfigLoader::new(format!("http://{}", addr), config.clone());

        let values = loader.load().await;
        assert_eq!(values.get(CREDENTIAL_KEY).map(String::as_str), Some("AIza-live"));
        assert!(config.credential_usable());
        assert_eq!(config.value("EXTRA").as_deref(), Some("1"));

        let notice = notice.await.unwrap();
        assert!(notice.success);
        assert!(notice.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_binding_fills_model_slot() {
        let config = Arc::new(RuntimeConfig::new());
        config.set_value(CREDENTIAL_KEY, "AIza-test");
        spawn_default_binding(config.clone());

        wait_for_readiness(
            || config.model().is_bound(),
            "model binding",
            MODEL_WAIT_ATTEMPTS,
            POLL_INTERVAL,
        )
        .await
        .unwrap();
        assert!(config.model().get().is_some());
    }

    #[tokio::test]
    async fn test_load_falls_back_when_endpoint_unreachable() {
        let config = Arc::new(RuntimeConfig::new());
        // Nothing listens on this port; the fetch fails immediately.
        let (loader, notice) = ConfigLoader::new("http://127.0.0.1:9", config.clone());

        let values = loader.load().await;
        assert_eq!(
            values.get(CREDENTIAL_KEY).map(String::as_str),
            Some(FALLBACK_API_KEY)
        );
        assert!(config.credential_usable());

        let notice = notice.await.unwrap();
        assert!(!notice.success);
        assert!(notice.error.is_some());
    }

    #[tokio::test]
    async fn test_load_emits_at_most_one_notice() {
        let config = Arc::new(RuntimeConfig::new());
        let (loader, mut notice) = ConfigLoader::new("http://127.0.0.1:9", config);

        loader.load().await;
        loader.load().await;

        assert!(notice.try_recv().is_ok());
        assert!(notice.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_times_out_without_credential() {
        let config = Arc::new(RuntimeConfig::new());
        let err = initialize(&config).await.unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::DependencyTimeout {
                dependency: "configuration",
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_builds_session_once_dependencies_land() {
        use shared::model_api::TextModel;

        struct Fake;
        #[async_trait::async_trait]
        impl TextModel for Fake {
            async fn generate(&self, _contents: &str) -> anyhow::Result<String> {
                Ok("ok".into())
            }
        }

        let config = Arc::new(RuntimeConfig::new());
        let set = Arc::new(AtomicBool::new(false));

        {
            let config = config.clone();
            let set = set.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(350)).await;
                config.set_value(CREDENTIAL_KEY, "AIza-test");
                tokio::time::sleep(Duration::from_millis(150)).await;
                config.model().bind(Arc::new(Fake));
                set.store(true, Ordering::SeqCst);
            });
        }

        let session = initialize(&config).await.unwrap();
        assert!(set.load(Ordering::SeqCst));
        assert!(session.history().is_empty());
    }
}

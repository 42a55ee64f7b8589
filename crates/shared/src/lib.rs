pub mod chat;
pub mod config;
pub mod error;

pub mod model_api {
    use anyhow::Result;
    use async_trait::async_trait;

    /// The one client interface the session talks to.
    ///
    /// Exactly one concrete implementation is chosen at composition time and
    /// registered in the [`crate::config::ModelSlot`]; nothing discovers
    /// clients at runtime.
    #[async_trait]
    pub trait TextModel: Send + Sync {
        /// Submit prompt text, get the assistant's reply text.
        async fn generate(&self, contents: &str) -> Result<String>;
    }
}

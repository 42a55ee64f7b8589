use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::config::{CredentialState, RuntimeConfig};
use shared::model_api::TextModel;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiCandidateContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

pub struct GeminiClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(model: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(Duration::from_secs(45)).build()?,
            auth_token: api_key.to_string(),
            model: model.to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    /// Build a client from the loaded runtime configuration. Fails when the
    /// credential slot holds anything other than a usable key.
    pub fn from_config(model: &str, config: &RuntimeConfig) -> Result<Self> {
        let credential = config.credential();
        if !credential.is_usable() {
            return Err(anyhow!(
                "no usable Gemini API key configured (credential state: {:?})",
                match credential {
                    CredentialState::Ready(_) => "placeholder value".to_string(),
                    other => format!("{:?}", other),
                }
            ));
        }
        let key = credential.key().unwrap_or_default().to_string();
        Self::new(model, &key)
    }

    /// Point the client at a different API root. Used by tests to target a
    /// local stub server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate_content(&self, contents: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.auth_token
        );
        let req = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: contents.to_string(),
                }],
            }],
        };
        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let body = body.trim();
            if body.is_empty() {
                return Err(anyhow!("gemini error: {}", status));
            }
            let body = if body.len() > 800 {
                format!("{}...", &body[..800])
            } else {
                body.to_string()
            };
            return Err(anyhow!("gemini error: {}\n{}", status, body));
        }
        let body: GeminiResponse = resp.json().await?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default();
        Ok(text)
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, contents: &str) -> Result<String> {
        self.generate_content(contents).await
    }
}

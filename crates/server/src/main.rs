//! Static file server plus the config-passthrough endpoint.
//!
//! `GET /api/config` relays the model credential from the process
//! environment; every other path is served from the static asset directory.
//! The credential never ships inside the static assets themselves.

use axum::{response::Json, routing::get, Router};
use serde_json::{Map, Value};
use shared::config::{CREDENTIAL_KEY, NOT_SET};
use std::path::PathBuf;
use tower_http::services::ServeDir;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetchat_server=info,tower_http=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    let static_dir = std::env::var("SHEETCHAT_STATIC_DIR").unwrap_or_else(|_| "static".into());
    let app = create_router(PathBuf::from(static_dir));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);
    let addr = format!("0.0.0.0:{}", port);
    info!("listening on http://{}", addr);
    info!("config endpoint at /api/config");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(static_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/config", get(get_config))
        // Everything else, including `/` -> index.html, comes off disk.
        .fallback_service(ServeDir::new(static_dir))
}

async fn get_config() -> Json<Value> {
    let key = std::env::var(CREDENTIAL_KEY).ok();
    info!(
        "config requested, credential {}",
        if key.is_some() { "present" } else { "absent" }
    );
    Json(config_payload(key))
}

/// Only the keys the frontend is allowed to see go into this payload.
fn config_payload(credential: Option<String>) -> Value {
    let key = credential
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| NOT_SET.to_string());
    let mut payload = Map::new();
    payload.insert(CREDENTIAL_KEY.to_string(), Value::String(key));
    Value::Object(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_relays_credential() {
        let payload = config_payload(Some("AIza-test".into()));
        assert_eq!(payload[CREDENTIAL_KEY], "AIza-test");
    }

    #[test]
    fn test_payload_defaults_to_not_set() {
        assert_eq!(config_payload(None)[CREDENTIAL_KEY], NOT_SET);
        assert_eq!(config_payload(Some(String::new()))[CREDENTIAL_KEY], NOT_SET);
    }

    #[test]
    fn test_router_builds() {
        let _ = create_router(PathBuf::from("static"));
    }
}

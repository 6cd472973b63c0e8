//! vendor_desk server
//!
//! Usage:
//!   cargo run --bin seed_data -- allow alice@example.com   # add to the allow-list
//!   cargo run --bin vendor_desk                           # start server
//!
//! Configuration comes from flags, the environment, or a `.env` file.

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;

use vendor_desk::auth::SessionKeys;
use vendor_desk::config::{AppConfig, DataBackend};
use vendor_desk::guard::ProtectedPaths;
use vendor_desk::hosted::HostedStore;
use vendor_desk::oauth::{GoogleOAuth, OAuthConfig};
use vendor_desk::rest::{create_router, AppState};
use vendor_desk::storage::{DataService, SledStore};
use vendor_desk::telemetry::init_tracing;

fn open_store(config: &AppConfig) -> Result<Arc<dyn DataService>, Box<dyn std::error::Error>> {
    match config.data_backend {
        DataBackend::Sled => {
            tracing::info!(path = %config.data_dir.display(), "using embedded sled store");
            Ok(Arc::new(SledStore::open(&config.data_dir)?))
        }
        DataBackend::Hosted => {
            let (Some(url), Some(key)) = (&config.hosted_data_url, &config.hosted_data_key) else {
                return Err("DATA_BACKEND=hosted needs HOSTED_DATA_URL and HOSTED_DATA_KEY".into());
            };
            tracing::info!(url = %url, "using hosted data service");
            Ok(Arc::new(HostedStore::new(url, key)?))
        }
    }
}

fn google_oauth(
    config: &AppConfig,
) -> Result<Option<Arc<GoogleOAuth>>, Box<dyn std::error::Error>> {
    let Some((id, secret)) = config.google_credentials() else {
        tracing::warn!(
            "GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set; \
             sign-in will fail with a configuration error"
        );
        return Ok(None);
    };
    let oauth = GoogleOAuth::new(OAuthConfig::google(id, secret, &config.public_url)?)?;
    Ok(Some(Arc::new(oauth)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = AppConfig::parse();
    let _log_guards = init_tracing(config.log_json, config.log_dir.as_deref());

    let state = AppState {
        store: open_store(&config)?,
        keys: SessionKeys::new(config.session_secret.as_bytes(), config.session_ttl_secs)?,
        oauth: google_oauth(&config)?,
        page_size: config.page_size as usize,
        secure_cookies: config.secure_cookies(),
    };
    let protected = ProtectedPaths::new(&config.protected_paths);
    let app = create_router(state, protected);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %config.bind, public_url = %config.public_url, "vendor_desk listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

//! Process configuration, read from the environment (and `.env` via dotenvy).

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataBackend {
    /// Embedded Sled database (local development).
    Sled,
    /// Hosted PostgREST-style data service.
    Hosted,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "vendor_desk", about = "Vendor management web service", long_about = None)]
pub struct AppConfig {
    #[arg(long, env = "VENDOR_DESK_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// External base URL, used for the OAuth redirect URI and the cookie `Secure` flag.
    #[arg(long, env = "VENDOR_DESK_PUBLIC_URL", default_value = "http://localhost:3000")]
    pub public_url: String,

    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: String,

    #[arg(
        long,
        env = "SESSION_TTL_SECS",
        default_value_t = 30 * 24 * 60 * 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub session_ttl_secs: u64,

    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,

    #[arg(long, env = "DATA_BACKEND", value_enum, default_value_t = DataBackend::Sled)]
    pub data_backend: DataBackend,

    #[arg(long, env = "DATA_DIR", default_value = "vendor_data")]
    pub data_dir: PathBuf,

    #[arg(long, env = "HOSTED_DATA_URL")]
    pub hosted_data_url: Option<String>,

    #[arg(long, env = "HOSTED_DATA_KEY", hide_env_values = true)]
    pub hosted_data_key: Option<String>,

    /// Path prefixes the route guard protects.
    #[arg(
        long,
        env = "PROTECTED_PATHS",
        value_delimiter = ',',
        default_value = "/dashboard,/vendors,/api/vendors,/api/session"
    )]
    pub protected_paths: Vec<String>,

    #[arg(
        long,
        env = "PAGE_SIZE",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub page_size: u32,

    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Also write daily-rolled log files to this directory.
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Session cookies get `Secure` when the service is served over HTTPS.
    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }

    /// Both OAuth credentials, when configured and non-empty.
    pub fn google_credentials(&self) -> Option<(&str, &str)> {
        let id = self.google_client_id.as_deref().filter(|v| !v.is_empty())?;
        let secret = self.google_client_secret.as_deref().filter(|v| !v.is_empty())?;
        Some((id, secret))
    }
}

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://dr-usama-sheikh-backend.vercel.app";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub state_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_base_url = env::var("API_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(5);
        if poll_interval_secs == 0 {
            anyhow::bail!("POLL_INTERVAL_SECS must be greater than 0");
        }

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(30);

        let state_dir = match env::var("DENTAL_ADMIN_STATE_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_state_dir()?,
        };

        Ok(Self {
            api_base_url,
            poll_interval: Duration::from_secs(poll_interval_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            state_dir,
        })
    }
}

fn default_state_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("cannot resolve a data directory; set DENTAL_ADMIN_STATE_DIR"))?;
    Ok(base.join("dental-admin"))
}

/// Settings for the in-memory reference backend.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub bind_addr: String,
    pub admin_email: String,
    pub admin_password: String,
    pub seed_sample_data: bool,
}

impl BackendConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let admin_email = env::var("ADMIN_EMAIL")?;
        let admin_password = env::var("ADMIN_PASSWORD")?;
        let seed_sample_data = env::var("SEED_SAMPLE_DATA")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
            .unwrap_or(true);

        Ok(Self {
            bind_addr,
            admin_email,
            admin_password,
            seed_sample_data,
        })
    }
}

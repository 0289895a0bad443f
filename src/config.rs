use std::{env, path::PathBuf};
use tracing::{info, warn};

pub const DEFAULT_USER_ID: &str = "default-user";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub profile_path: PathBuf,
    pub user_id: String,
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// `None` is reported to callers as a configuration error at request time.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let port = match var("PORT") {
            Some(value) => value.parse::<u16>().unwrap_or_else(|err| {
                warn!("invalid PORT value {value:?}: {err}, using 8080");
                8080
            }),
            None => 8080,
        };

        let api_key = var("OPENAI_API_KEY").or_else(|| var("NEXT_PUBLIC_OPENAI_API_KEY"));
        if api_key.is_none() {
            warn!("OPENAI_API_KEY not set, nutrition estimation will be unavailable");
        }

        Self {
            port,
            data_path: PathBuf::from(or_default("APP_DATA_PATH", "data/state.json")),
            profile_path: PathBuf::from(or_default("APP_PROFILE_PATH", "data/profile.json")),
            user_id: or_default("HEALTH_USER_ID", DEFAULT_USER_ID),
            openai: OpenAiConfig {
                api_key,
                base_url: or_default("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
                model: or_default("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            },
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn or_default(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

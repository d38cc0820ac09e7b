use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    /// Optional JSON file holding an `EngineConfig`; defaults apply when unset.
    pub engine_config_path: Option<String>,
    pub engine: EngineEnvConfig,
}

#[derive(Debug, Clone, Default)]
pub struct EngineEnvConfig {
    pub selector_target_success: Option<f64>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/adaptive.sled"),
            engine_config_path: env_opt("ENGINE_CONFIG_PATH"),
            engine: EngineEnvConfig {
                selector_target_success: env_opt_parse("ENGINE_SELECTOR_TARGET_SUCCESS"),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    env_opt_parse(key).unwrap_or(default)
}

pub fn env_opt_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(
                key,
                value = %raw,
                "Failed to parse env var, using default"
            );
            None
        }
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

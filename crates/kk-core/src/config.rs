use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

pub const DEFAULT_CATEGORY_PAGE_SIZE: usize = 6;

/// Typed configuration, loaded from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub api_base_url: String,
    /// Ordered allow-list of category names. The first one is the default.
    pub api_categories: Vec<String>,
    pub database_path: PathBuf,

    // Behavior
    pub category_page_size: usize,
    pub reply_unsupported: bool,

    // Timeouts
    pub operation_timeout: Duration,
    pub http_timeout: Duration,

    // Outbound throttling
    pub throttle_global: Duration,
    pub throttle_per_chat: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let api_base_url = env_str("API_BASE_URL")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("API_BASE_URL environment variable is required".to_string())
            })?
            .trim_end_matches('/')
            .to_string();

        let api_categories = parse_csv(env_str("API_CATEGORIES"));
        if api_categories.is_empty() {
            return Err(Error::Config(
                "API_CATEGORIES must list at least one category".to_string(),
            ));
        }

        let database_path = PathBuf::from(
            env_str("DATABASE_PATH").unwrap_or_else(|| "kawaii-keeper.db".to_string()),
        );

        let category_page_size =
            env_usize("CATEGORY_PAGE_SIZE").unwrap_or(DEFAULT_CATEGORY_PAGE_SIZE);
        if category_page_size == 0 {
            return Err(Error::Config(
                "CATEGORY_PAGE_SIZE must be greater than zero".to_string(),
            ));
        }
        let reply_unsupported = env_bool("REPLY_UNSUPPORTED").unwrap_or(true);

        let operation_timeout =
            Duration::from_millis(env_u64("OPERATION_TIMEOUT_MS").unwrap_or(10_000));
        let http_timeout = Duration::from_millis(env_u64("HTTP_TIMEOUT_MS").unwrap_or(10_000));

        // Conservative Telegram flood-control defaults.
        let throttle_global = Duration::from_millis(env_u64("THROTTLE_GLOBAL_MS").unwrap_or(40));
        let throttle_per_chat =
            Duration::from_millis(env_u64("THROTTLE_PER_CHAT_MS").unwrap_or(1050));

        Ok(Self {
            telegram_bot_token,
            api_base_url,
            api_categories,
            database_path,
            category_page_size,
            reply_unsupported,
            operation_timeout,
            http_timeout,
            throttle_global,
            throttle_per_chat,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

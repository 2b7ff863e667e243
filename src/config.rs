use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";
pub const DEFAULT_TIMEZONE: &str = "Asia/Ho_Chi_Minh";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Key/value pairs from a dotenv style file. Lookups fall back to the
/// process environment.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
        Self::parse(&content)
    }

    /// Config for an optional explicit path. A path that cannot be read is an
    /// error; no path means environment only.
    pub fn load(path: Option<&str>) -> Result<Self, String> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            values.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
            .filter(|v| !v.trim().is_empty())
    }
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted { &value[1..value.len() - 1] } else { value }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub token: Option<String>,
    pub timezone: Tz,
    pub timeout: Duration,
}

impl Settings {
    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        let timezone_name = config.get("TIMEZONE").unwrap_or(DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| format!("Unknown TIMEZONE {}", timezone_name))?;
        let timeout = match config.get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("Invalid REQUEST_TIMEOUT_SECS {}", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            base_url: config.get("API_BASE_URL").unwrap_or(DEFAULT_BASE_URL.to_string()),
            token: config.get("API_TOKEN"),
            timezone,
            timeout: Duration::from_secs(timeout),
        })
    }

    /// Wall-clock time in the configured timezone.
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

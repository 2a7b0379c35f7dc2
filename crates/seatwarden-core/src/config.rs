use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{AttemptBudget, WatchdogConfig};

pub const DEFAULT_BASE_URL: &str = "https://wechat.v2.traceint.com";
pub const DEFAULT_USER_AGENT: &str = "MicroMessenger/8.0.2";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_SANDBOX_TIME_LIMIT_MS: u64 = 1_000;
/// The service runs on Asia/Shanghai time (UTC+8, no DST).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 8 * 60;

/// Top-level config (seatwarden.toml or config.json + SEATWARDEN_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub room_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub seat_no: String,
    /// Daily fire time, `HH:MM:SS` in the service's time zone.
    pub time: String,
    /// `wechatSESS_ID` cookie value identifying the session.
    #[serde(deserialize_with = "string_or_number")]
    pub sessid: String,
    /// Start the check-in watchdog after each scheduled run.
    #[serde(default = "bool_true")]
    pub auto_cancel: bool,
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub watchdog: WatchdogSettings,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogSettings {
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: i64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            threshold_secs: default_threshold_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_sandbox_time_limit_ms")]
    pub time_limit_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: DEFAULT_SANDBOX_TIME_LIMIT_MS,
        }
    }
}

/// Ids are numeric on the service, so JSON files and `SEATWARDEN_*` env vars
/// often carry them as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Unsigned(n) => n.to_string(),
        Id::Signed(n) => n.to_string(),
    })
}

fn bool_true() -> bool {
    true
}
fn default_utc_offset_minutes() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_max_attempts() -> u32 {
    AttemptBudget::default().max_attempts
}
fn default_delay_ms() -> u64 {
    200
}
fn default_threshold_secs() -> i64 {
    WatchdogConfig::default().threshold_secs
}
fn default_poll_interval_secs() -> u64 {
    30
}
fn default_sandbox_time_limit_ms() -> u64 {
    DEFAULT_SANDBOX_TIME_LIMIT_MS
}

impl AppConfig {
    /// Load config from a TOML or JSON file with SEATWARDEN_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.seatwarden/seatwarden.toml
    ///
    /// Files ending in `.json` are read as JSON. Nested keys in env vars are
    /// separated by `__` (e.g. `SEATWARDEN_RETRY__MAX_ATTEMPTS`).
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let figment = if path.ends_with(".json") {
            Figment::new().merge(Json::file(&path))
        } else {
            Figment::new().merge(Toml::file(&path))
        };

        let config: AppConfig = figment
            .merge(Env::prefixed("SEATWARDEN_").split("__"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        config.fire_time()?;
        config.offset()?;
        Ok(config)
    }

    /// Parse `time` into a wall-clock time of day.
    pub fn fire_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.time.trim(), "%H:%M:%S")
            .map_err(|e| CoreError::InvalidTime(format!("{:?}: {e}", self.time)))
    }

    /// The service's fixed UTC offset.
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            CoreError::Config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn attempt_budget(&self) -> AttemptBudget {
        AttemptBudget {
            max_attempts: self.retry.max_attempts,
            inter_attempt_delay: Duration::from_millis(self.retry.delay_ms),
        }
    }

    pub fn watchdog_config(&self) -> WatchdogConfig {
        WatchdogConfig {
            threshold_secs: self.watchdog.threshold_secs,
            poll_interval: Duration::from_secs(self.watchdog.poll_interval_secs),
        }
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.seatwarden/seatwarden.toml", home)
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    const MINIMAL_TOML: &str = r#"
        room_id = "12"
        seat_no = "80"
        time = "06:59:58"
        sessid = "abc"
    "#;

    #[test]
    fn toml_config_with_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("seatwarden.toml", MINIMAL_TOML)?;
            let config = AppConfig::load(Some("seatwarden.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.room_id, "12");
            assert!(config.auto_cancel);
            assert_eq!(config.http.timeout_ms, 3_000);
            assert_eq!(config.attempt_budget(), AttemptBudget::default());
            assert_eq!(config.watchdog_config(), WatchdogConfig::default());
            assert_eq!(
                config.fire_time().unwrap(),
                NaiveTime::from_hms_opt(6, 59, 58).unwrap()
            );
            assert_eq!(config.offset().unwrap().local_minus_utc(), 8 * 3600);
            Ok(())
        });
    }

    #[test]
    fn json_config_is_accepted() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.json",
                r#"{"room_id": "7", "seat_no": "21", "time": "07:00:00", "sessid": "s",
                    "auto_cancel": false, "retry": {"max_attempts": 3}}"#,
            )?;
            let config = AppConfig::load(Some("config.json")).map_err(|e| e.to_string())?;
            assert_eq!(config.seat_no, "21");
            assert!(!config.auto_cancel);
            assert_eq!(config.retry.max_attempts, 3);
            assert_eq!(config.retry.delay_ms, 200);
            Ok(())
        });
    }

    #[test]
    fn numeric_ids_in_json_are_read_as_text() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.json",
                r#"{"room_id": 12, "seat_no": 80, "time": "06:59:58", "sessid": 123456}"#,
            )?;
            let config = AppConfig::load(Some("config.json")).map_err(|e| e.to_string())?;
            assert_eq!(config.room_id, "12");
            assert_eq!(config.seat_no, "80");
            assert_eq!(config.sessid, "123456");
            Ok(())
        });
    }

    #[test]
    fn env_overrides_numeric_ids() {
        Jail::expect_with(|jail| {
            jail.create_file("seatwarden.toml", MINIMAL_TOML)?;
            jail.set_env("SEATWARDEN_SEAT_NO", "81");
            jail.set_env("SEATWARDEN_ROOM_ID", "15");
            jail.set_env("SEATWARDEN_RETRY__MAX_ATTEMPTS", "4");
            let config = AppConfig::load(Some("seatwarden.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.seat_no, "81");
            assert_eq!(config.room_id, "15");
            assert_eq!(config.retry.max_attempts, 4);
            Ok(())
        });
    }

    #[test]
    fn malformed_time_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "seatwarden.toml",
                r#"
                room_id = "12"
                seat_no = "80"
                time = "7 o'clock"
                sessid = "abc"
                "#,
            )?;
            let err = AppConfig::load(Some("seatwarden.toml")).unwrap_err();
            assert_eq!(err.code(), "INVALID_TIME");
            Ok(())
        });
    }

    #[test]
    fn missing_required_field_is_config_error() {
        Jail::expect_with(|jail| {
            jail.create_file("seatwarden.toml", "room_id = \"12\"\n")?;
            let err = AppConfig::load(Some("seatwarden.toml")).unwrap_err();
            assert!(matches!(err, CoreError::Config(_)));
            Ok(())
        });
    }
}

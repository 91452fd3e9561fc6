// File: voucherbot-core/src/config.rs
//
// Runtime settings. Everything has a default; `BotConfig::from_env` layers
// `VOUCHERBOT_*` environment variables (and an optional `.env` file) on top.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;
use url::Url;
use voucherbot_common::models::{ValueTable, DEFAULT_MIN_CODE_LEN};

use crate::Error;

pub const DEFAULT_API_BASE: &str = "https://www.sheinindia.in";

/// 1.5s keeps 50 codes at roughly 75s per pass without tripping the
/// remote rate limiter.
pub const DEFAULT_CHECK_DELAY_SECS: f64 = 1.5;
pub const DEFAULT_INTERVAL_SECS: u64 = 180;
pub const DEFAULT_SLEEP_INCREMENT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub check_timeout: Duration,
    pub reset_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
            check_timeout: Duration::from_secs(60),
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Bounded retry for outbound notices.
#[derive(Debug, Clone)]
pub struct NotifyRetryPolicy {
    pub attempts: u32,
    /// Multiplied by the attempt number when the channel reports a flood.
    pub flood_backoff: Duration,
    /// Flat wait after any other delivery failure.
    pub retry_delay: Duration,
}

impl Default for NotifyRetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            flood_backoff: Duration::from_secs(5),
            retry_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProtectionConfig {
    /// Wait between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Granularity of that wait; bounds how long a stop request can go unnoticed.
    pub sleep_increment: Duration,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            sleep_increment: Duration::from_secs(DEFAULT_SLEEP_INCREMENT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub check_delay: Duration,
    pub protection: ProtectionConfig,
    pub min_code_len: usize,
    pub cookies_path: PathBuf,
    pub api: ApiConfig,
    pub notify: NotifyRetryPolicy,
    pub value_table: ValueTable,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            check_delay: Duration::from_secs_f64(DEFAULT_CHECK_DELAY_SECS),
            protection: ProtectionConfig::default(),
            min_code_len: DEFAULT_MIN_CODE_LEN,
            cookies_path: PathBuf::from("cookies.json"),
            api: ApiConfig::default(),
            notify: NotifyRetryPolicy::default(),
            value_table: ValueTable::default(),
        }
    }
}

impl BotConfig {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = BotConfig::default();

        if let Some(raw) = lookup("VOUCHERBOT_CHECK_DELAY_SECS") {
            cfg.check_delay = parse_secs_f64("VOUCHERBOT_CHECK_DELAY_SECS", &raw)?;
        }
        if let Some(raw) = lookup("VOUCHERBOT_INTERVAL_SECS") {
            cfg.protection.interval = parse_secs("VOUCHERBOT_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("VOUCHERBOT_SLEEP_INCREMENT_SECS") {
            cfg.protection.sleep_increment = parse_secs("VOUCHERBOT_SLEEP_INCREMENT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("VOUCHERBOT_MIN_CODE_LEN") {
            cfg.min_code_len = parse_u64("VOUCHERBOT_MIN_CODE_LEN", &raw)? as usize;
        }
        if let Some(raw) = lookup("VOUCHERBOT_COOKIES_PATH") {
            cfg.cookies_path = PathBuf::from(raw.trim());
        }
        if let Some(raw) = lookup("VOUCHERBOT_API_BASE") {
            cfg.api.base_url = Url::parse(raw.trim())
                .map_err(|e| Error::Config(format!("VOUCHERBOT_API_BASE: {e}")))?;
        }
        if let Some(raw) = lookup("VOUCHERBOT_CHECK_TIMEOUT_SECS") {
            cfg.api.check_timeout = parse_secs("VOUCHERBOT_CHECK_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("VOUCHERBOT_RESET_TIMEOUT_SECS") {
            cfg.api.reset_timeout = parse_secs("VOUCHERBOT_RESET_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("VOUCHERBOT_VALUE_TABLE") {
            cfg.value_table = parse_value_table(&raw)?;
        }
        if let Some(raw) = lookup("VOUCHERBOT_NOTIFY_ATTEMPTS") {
            let attempts = parse_u64("VOUCHERBOT_NOTIFY_ATTEMPTS", &raw)?;
            cfg.notify.attempts = u32::try_from(attempts).map_err(|_| {
                Error::Config(format!("VOUCHERBOT_NOTIFY_ATTEMPTS: {attempts} is out of range"))
            })?;
        }
        if let Some(raw) = lookup("VOUCHERBOT_FLOOD_BACKOFF_SECS") {
            cfg.notify.flood_backoff = parse_secs("VOUCHERBOT_FLOOD_BACKOFF_SECS", &raw)?;
        }
        if let Some(raw) = lookup("VOUCHERBOT_NOTIFY_RETRY_SECS") {
            cfg.notify.retry_delay = parse_secs("VOUCHERBOT_NOTIFY_RETRY_SECS", &raw)?;
        }

        cfg.validate()?;
        debug!(
            check_delay_ms = cfg.check_delay.as_millis() as u64,
            interval_secs = cfg.protection.interval.as_secs(),
            prefixes = cfg.value_table.len(),
            "loaded bot config"
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.protection.sleep_increment.is_zero() {
            return Err(Error::Config("sleep increment must be greater than zero".into()));
        }
        if self.protection.interval.is_zero() {
            return Err(Error::Config("protection interval must be greater than zero".into()));
        }
        if self.min_code_len == 0 {
            return Err(Error::Config("minimum code length must be at least 1".into()));
        }
        if self.notify.attempts == 0 {
            return Err(Error::Config("notify attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Rough wall-clock duration of one scan over `active` codes.
    pub fn estimated_scan_time(&self, active: usize) -> Duration {
        self.check_delay
            .saturating_mul(u32::try_from(active).unwrap_or(u32::MAX))
    }

    /// Scan plus the inter-cycle wait.
    pub fn estimated_cycle_time(&self, active: usize) -> Duration {
        self.estimated_scan_time(active) + self.protection.interval
    }
}

/// Parses a JSON object of `prefix -> face value`, e.g. `{"SVH": 4000}`.
pub fn parse_value_table(raw: &str) -> Result<ValueTable, Error> {
    let map: HashMap<String, u32> = serde_json::from_str(raw)
        .map_err(|e| Error::Config(format!("VOUCHERBOT_VALUE_TABLE: {e}")))?;
    if map.is_empty() {
        return Err(Error::Config("VOUCHERBOT_VALUE_TABLE: table is empty".into()));
    }
    Ok(ValueTable::new(map))
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| Error::Config(format!("{key}: '{raw}' is not a whole number ({e})")))
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, Error> {
    parse_u64(key, raw).map(Duration::from_secs)
}

fn parse_secs_f64(key: &str, raw: &str) -> Result<Duration, Error> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}: '{raw}' is not a number ({e})")))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::Config(format!("{key}: must be a non-negative number of seconds")));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use voucherbot_common::models::VoucherValue;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let cfg = BotConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.check_delay, Duration::from_millis(1500));
        assert_eq!(cfg.protection.interval, Duration::from_secs(180));
        assert_eq!(cfg.protection.sleep_increment, Duration::from_secs(5));
        assert_eq!(cfg.min_code_len, 5);
        assert_eq!(cfg.value_table.lookup("SV3ABCDE"), VoucherValue::Known(5000));
    }

    #[test]
    fn test_overrides_are_applied() {
        let cfg = BotConfig::from_lookup(lookup_from(&[
            ("VOUCHERBOT_CHECK_DELAY_SECS", "0.25"),
            ("VOUCHERBOT_INTERVAL_SECS", "600"),
            ("VOUCHERBOT_VALUE_TABLE", r#"{"SVH": 4000, "SVHX": 9000}"#),
            ("VOUCHERBOT_API_BASE", "http://127.0.0.1:8080"),
        ]))
        .unwrap();
        assert_eq!(cfg.check_delay, Duration::from_millis(250));
        assert_eq!(cfg.protection.interval, Duration::from_secs(600));
        assert_eq!(cfg.value_table.lookup("SVHX1234"), VoucherValue::Known(9000));
        assert_eq!(cfg.api.base_url.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = BotConfig::from_lookup(lookup_from(&[("VOUCHERBOT_INTERVAL_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("VOUCHERBOT_INTERVAL_SECS"));

        let err = BotConfig::from_lookup(lookup_from(&[("VOUCHERBOT_CHECK_DELAY_SECS", "-1")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = BotConfig::from_lookup(lookup_from(&[("VOUCHERBOT_SLEEP_INCREMENT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_estimates() {
        let cfg = BotConfig::default();
        assert_eq!(cfg.estimated_scan_time(40), Duration::from_secs(60));
        assert_eq!(cfg.estimated_cycle_time(40), Duration::from_secs(240));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_estimate_saturates_for_huge_counts() {
        let cfg = BotConfig::default();
        let huge = u32::MAX as usize + 2;
        assert_eq!(cfg.estimated_scan_time(huge), cfg.check_delay * u32::MAX);
    }

    #[test]
    fn test_notify_attempts_out_of_range_is_rejected() {
        let err = BotConfig::from_lookup(lookup_from(&[("VOUCHERBOT_NOTIFY_ATTEMPTS", "4294967297")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("VOUCHERBOT_NOTIFY_ATTEMPTS")));

        let cfg = BotConfig::from_lookup(lookup_from(&[("VOUCHERBOT_NOTIFY_ATTEMPTS", "4")])).unwrap();
        assert_eq!(cfg.notify.attempts, 4);
    }
}

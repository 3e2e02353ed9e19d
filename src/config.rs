use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub source: SourceConfig,
    pub worker: WorkerConfig,
    pub recommend: RecommendConfig,
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub mock: bool,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
    /// Cron for the weekly ingestion job, evaluated in `timezone`.
    pub ingestion_cron: String,
    /// Cron for the ingestion-confirmation + settlement job, offset after
    /// the ingestion job.
    pub settlement_cron: String,
    /// IANA zone of the source's publication cutover.
    pub timezone: String,
}

#[derive(Debug, Clone)]
pub struct RecommendConfig {
    pub default_window: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/lotto.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            source: SourceConfig {
                base_url: env_or("SOURCE_BASE_URL", "https://www.dhlottery.co.kr"),
                timeout_secs: env_or_parse("SOURCE_TIMEOUT_SECS", 5_u64),
                mock: env_or_bool("SOURCE_MOCK", false),
            },
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
                // Draws are published Saturday ~20:35 at the source's cutover.
                ingestion_cron: env_or("INGESTION_CRON", "0 50 20 * * Sat"),
                settlement_cron: env_or("SETTLEMENT_CRON", "0 10 21 * * Sat"),
                timezone: env_or("WORKER_TIMEZONE", "Asia/Seoul"),
            },
            recommend: RecommendConfig {
                default_window: env_or_parse(
                    "RECOMMEND_DEFAULT_WINDOW",
                    crate::constants::DEFAULT_RECOMMEND_WINDOW,
                ),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
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

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "SOURCE_BASE_URL",
            "SOURCE_TIMEOUT_SECS",
            "SOURCE_MOCK",
            "INGESTION_CRON",
            "RECOMMEND_DEFAULT_WINDOW",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.source.timeout_secs, 5);
        assert!(!cfg.source.mock);
        assert_eq!(cfg.worker.timezone, "Asia/Seoul");
    }

    #[test]
    fn parses_numeric_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4000");
        env::set_var("SOURCE_TIMEOUT_SECS", "9");
        env::set_var("RECOMMEND_DEFAULT_WINDOW", "104");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.source.timeout_secs, 9);
        assert_eq!(cfg.recommend.default_window, 104);
        clear_keys(managed_keys());
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("SOURCE_TIMEOUT_SECS", "soon");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.source.timeout_secs, 5);
        clear_keys(managed_keys());
    }

    #[test]
    fn mock_flag_parses_truthy_forms() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("SOURCE_MOCK", "yes");
        let cfg = Config::from_env();
        assert!(cfg.source.mock);
        clear_keys(managed_keys());
    }
}

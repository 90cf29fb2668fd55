//! Application configuration loaded from environment variables.

use saga::EngineSettings;

/// Upper bound for configured collection durations (one year). Larger
/// values would overflow timestamp arithmetic.
pub const MAX_DURATION_SECS: i64 = 366 * 24 * 60 * 60;

/// Server and engine configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset keeps the journal
///   in memory
/// - `COLLECTION_BOOKING_DELAY_SECS`: how far after scheduling a collection
///   gets booked (default: `5`)
/// - `COLLECTION_LATE_TOLERANCE_SECS`: how late a booking timer may fire
///   before the window counts as missed (default: `3600`)
/// - `STEP_MAX_ATTEMPTS`: attempts per remote step (default: `3`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub collection_booking_delay_secs: i64,
    pub collection_late_tolerance_secs: i64,
    pub step_max_attempts: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            collection_booking_delay_secs: parse_env("COLLECTION_BOOKING_DELAY_SECS")
                .unwrap_or(defaults.collection_booking_delay_secs),
            collection_late_tolerance_secs: parse_env("COLLECTION_LATE_TOLERANCE_SECS")
                .unwrap_or(defaults.collection_late_tolerance_secs),
            step_max_attempts: parse_env("STEP_MAX_ATTEMPTS")
                .unwrap_or(defaults.step_max_attempts),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn booking_delay(&self) -> chrono::Duration {
        bounded_seconds(self.collection_booking_delay_secs)
    }

    /// Engine settings derived from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings::default()
            .with_max_attempts(self.step_max_attempts)
            .with_late_tolerance(bounded_seconds(self.collection_late_tolerance_secs))
    }
}

fn bounded_seconds(secs: i64) -> chrono::Duration {
    chrono::Duration::seconds(secs.clamp(0, MAX_DURATION_SECS))
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            collection_booking_delay_secs: 5,
            collection_late_tolerance_secs: 3600,
            step_max_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.booking_delay(), chrono::Duration::seconds(5));
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_engine_settings() {
        let config = Config {
            collection_late_tolerance_secs: 60,
            step_max_attempts: 5,
            ..Config::default()
        };
        let settings = config.engine_settings();
        assert_eq!(
            settings.collection_late_tolerance,
            chrono::Duration::seconds(60)
        );
        assert_eq!(settings.carrier.retry.max_attempts, 5);
        assert_eq!(settings.documents.retry.max_attempts, 5);
    }

    #[test]
    fn test_negative_durations_clamp_to_zero() {
        let config = Config {
            collection_booking_delay_secs: -10,
            ..Config::default()
        };
        assert_eq!(config.booking_delay(), chrono::Duration::zero());
    }

    #[test]
    fn test_huge_durations_are_capped() {
        let config = Config {
            collection_booking_delay_secs: i64::MAX,
            collection_late_tolerance_secs: i64::MAX,
            ..Config::default()
        };
        let cap = chrono::Duration::seconds(MAX_DURATION_SECS);
        assert_eq!(config.booking_delay(), cap);
        assert_eq!(config.engine_settings().collection_late_tolerance, cap);
        assert!(chrono::Utc::now().checked_add_signed(config.booking_delay()).is_some());
    }
}

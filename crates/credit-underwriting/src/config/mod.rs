use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::underwriting::WizardPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub underwriting: UnderwritingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            underwriting: UnderwritingConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Model, collaborator and gating settings for the underwriting wizard.
#[derive(Debug, Clone, PartialEq)]
pub struct UnderwritingConfig {
    /// JSON logistic-model artifact; the baseline scorecard is used when absent.
    pub model_path: Option<PathBuf>,
    pub extraction_timeout: Duration,
    pub notification_timeout: Duration,
    pub require_loan_before_upload: bool,
    pub notify_sender: String,
    /// OCR binary fed document bytes on stdin; plain-text extraction when absent.
    pub ocr_command: Option<PathBuf>,
}

impl Default for UnderwritingConfig {
    fn default() -> Self {
        let policy = WizardPolicy::default();
        Self {
            model_path: None,
            extraction_timeout: policy.extraction_timeout,
            notification_timeout: policy.notification_timeout,
            require_loan_before_upload: policy.require_loan_before_upload,
            notify_sender: "underwriting@localhost".to_string(),
            ocr_command: None,
        }
    }
}

impl UnderwritingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            model_path: optional_path("UNDERWRITING_MODEL_PATH"),
            extraction_timeout: duration_ms(
                "UNDERWRITING_EXTRACTION_TIMEOUT_MS",
                defaults.extraction_timeout,
            )?,
            notification_timeout: duration_ms(
                "UNDERWRITING_NOTIFICATION_TIMEOUT_MS",
                defaults.notification_timeout,
            )?,
            require_loan_before_upload: flag(
                "UNDERWRITING_REQUIRE_LOAN_BEFORE_UPLOAD",
                defaults.require_loan_before_upload,
            )?,
            notify_sender: env::var("UNDERWRITING_NOTIFY_SENDER")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.notify_sender),
            ocr_command: optional_path("UNDERWRITING_OCR_COMMAND"),
        })
    }

    pub fn wizard_policy(&self) -> WizardPolicy {
        WizardPolicy {
            require_loan_before_upload: self.require_loan_before_upload,
            extraction_timeout: self.extraction_timeout,
            notification_timeout: self.notification_timeout,
        }
    }
}

fn optional_path(key: &'static str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn duration_ms(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
            .ok_or(ConfigError::InvalidDuration { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { key, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDuration { key: &'static str, value: String },
    InvalidFlag { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDuration { key, value } => {
                write!(f, "{key} must be a positive number of milliseconds, got '{value}'")
            }
            ConfigError::InvalidFlag { key, value } => {
                write!(f, "{key} must be true or false, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDuration { .. }
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "UNDERWRITING_MODEL_PATH",
            "UNDERWRITING_EXTRACTION_TIMEOUT_MS",
            "UNDERWRITING_NOTIFICATION_TIMEOUT_MS",
            "UNDERWRITING_REQUIRE_LOAN_BEFORE_UPLOAD",
            "UNDERWRITING_NOTIFY_SENDER",
            "UNDERWRITING_OCR_COMMAND",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().unwrap_or_else(|p| p.into_inner());
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.underwriting, UnderwritingConfig::default());
        assert_eq!(config.underwriting.wizard_policy(), WizardPolicy::default());
    }

    #[test]
    fn reads_underwriting_overrides() {
        let _lock = env_guard().lock().unwrap_or_else(|p| p.into_inner());
        reset_env();
        env::set_var("UNDERWRITING_MODEL_PATH", "models/credit.json");
        env::set_var("UNDERWRITING_EXTRACTION_TIMEOUT_MS", "250");
        env::set_var("UNDERWRITING_REQUIRE_LOAN_BEFORE_UPLOAD", "false");
        env::set_var("UNDERWRITING_NOTIFY_SENDER", "loans@example.com");

        let config = AppConfig::load().expect("config loads");
        let underwriting = &config.underwriting;
        assert_eq!(
            underwriting.model_path.as_deref(),
            Some(std::path::Path::new("models/credit.json"))
        );
        assert_eq!(underwriting.extraction_timeout, Duration::from_millis(250));
        assert!(!underwriting.require_loan_before_upload);
        assert_eq!(underwriting.notify_sender, "loans@example.com");
        assert!(underwriting.ocr_command.is_none());
        reset_env();
    }

    #[test]
    fn rejects_malformed_underwriting_values() {
        let _lock = env_guard().lock().unwrap_or_else(|p| p.into_inner());
        reset_env();
        env::set_var("UNDERWRITING_NOTIFICATION_TIMEOUT_MS", "soon");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidDuration { key: "UNDERWRITING_NOTIFICATION_TIMEOUT_MS", .. })
        ));

        reset_env();
        env::set_var("UNDERWRITING_REQUIRE_LOAN_BEFORE_UPLOAD", "maybe");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag { .. })
        ));
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().unwrap_or_else(|p| p.into_inner());
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }
}

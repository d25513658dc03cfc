use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::applications::TriageThresholds;
use crate::workflows::retry::RetryPolicy;

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
    pub triage: TriageConfig,
    pub notifications: NotificationConfig,
    pub documents: DocumentConfig,
    pub scoring: ScoringConfig,
    pub smtp: Option<SmtpConfig>,
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

        let auto_send_threshold = threshold_var("AUTO_SEND_THRESHOLD", 80)?;
        let manual_review_threshold = threshold_var("MANUAL_REVIEW_THRESHOLD", 60)?;
        if manual_review_threshold > auto_send_threshold {
            return Err(ConfigError::ThresholdOrder {
                auto_send: auto_send_threshold,
                manual_review: manual_review_threshold,
            });
        }

        let notifications = NotificationConfig {
            admin_email: env::var("ADMIN_CONTACT_EMAIL")
                .unwrap_or_else(|_| "contact@talent-pipeline.local".to_string()),
            frontend_base_url: env::var("FRONTEND_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            from_address: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@talent-pipeline.local".to_string()),
            sender_name: env::var("MAIL_SENDER_NAME")
                .unwrap_or_else(|_| "Talent Pipeline".to_string()),
        };

        let documents = DocumentConfig {
            storage_root: env::var("DOCUMENT_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./storage")),
            base_url: env::var("DOCUMENT_BASE_URL").ok(),
        };

        let timeout_secs = env::var("SCORER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber {
                name: "SCORER_TIMEOUT_SECS",
            })?;
        let max_retries = env::var("SCORER_MAX_RETRIES")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber {
                name: "SCORER_MAX_RETRIES",
            })?;
        let scoring = ScoringConfig {
            program: env::var("SCORER_PROGRAM").unwrap_or_else(|_| "python3".to_string()),
            script: env::var("SCORER_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("ai-service/cv_job_matcher.py")),
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
        };

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidNumber { name: "SMTP_PORT" })?,
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            triage: TriageConfig {
                auto_send_threshold,
                manual_review_threshold,
            },
            notifications,
            documents,
            scoring,
            smtp,
        })
    }
}

fn threshold_var(name: &'static str, default: u8) -> Result<u8, ConfigError> {
    let raw = match env::var(name) {
        Ok(raw) => raw,
        Err(_) => return Ok(default),
    };
    match raw.trim().parse::<u8>() {
        Ok(value) if value <= 100 => Ok(value),
        _ => Err(ConfigError::InvalidThreshold { name, value: raw }),
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

/// Score boundaries routing applications into triage bands.
#[derive(Debug, Clone, Copy)]
pub struct TriageConfig {
    pub auto_send_threshold: u8,
    pub manual_review_threshold: u8,
}

impl TriageConfig {
    pub fn thresholds(&self) -> Result<TriageThresholds, ConfigError> {
        TriageThresholds::new(self.auto_send_threshold, self.manual_review_threshold).map_err(
            |_| ConfigError::ThresholdOrder {
                auto_send: self.auto_send_threshold,
                manual_review: self.manual_review_threshold,
            },
        )
    }
}

/// Addresses and links embedded in outgoing notifications.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub admin_email: String,
    pub frontend_base_url: String,
    pub from_address: String,
    pub sender_name: String,
}

/// Where CV documents are read from.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub storage_root: PathBuf,
    pub base_url: Option<String>,
}

/// External scorer invocation settings.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub program: String,
    pub script: PathBuf,
    /// Limit for a single scorer run.
    pub timeout: Duration,
    pub max_retries: u32,
}

/// Slack for process start-up so the last attempt reports its own timeout.
const SCORER_SPAWN_ALLOWANCE: Duration = Duration::from_secs(1);

impl ScoringConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    /// Limit for a whole scoring call, every retry and backoff included.
    pub fn deadline(&self) -> Duration {
        self.retry_policy().deadline(self.timeout) + SCORER_SPAWN_ALLOWANCE
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidThreshold { name: &'static str, value: String },
    ThresholdOrder { auto_send: u8, manual_review: u8 },
    InvalidNumber { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidThreshold { name, value } => {
                write!(f, "{name} must be an integer between 0 and 100 (found '{value}')")
            }
            ConfigError::ThresholdOrder {
                auto_send,
                manual_review,
            } => write!(
                f,
                "MANUAL_REVIEW_THRESHOLD ({manual_review}) must not exceed AUTO_SEND_THRESHOLD ({auto_send})"
            ),
            ConfigError::InvalidNumber { name } => write!(f, "{name} must be a valid number"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidThreshold { .. }
            | ConfigError::ThresholdOrder { .. }
            | ConfigError::InvalidNumber { .. } => None,
        }
    }
}

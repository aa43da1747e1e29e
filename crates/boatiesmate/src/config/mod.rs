use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub booking: BookingConfig,
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
        let ansi = match env::var("APP_LOG_ANSI") {
            Ok(raw) => parse_flag("APP_LOG_ANSI", &raw)?,
            Err(_) => false,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            booking: BookingConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Result-size limits for alternative proposals, availability search, and the inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingConfig {
    pub alternatives_limit: usize,
    pub availability_default_limit: usize,
    pub availability_max_limit: usize,
    pub inbox_default_limit: usize,
    pub inbox_max_limit: usize,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            alternatives_limit: 10,
            availability_default_limit: 20,
            availability_max_limit: 100,
            inbox_default_limit: 50,
            inbox_max_limit: 200,
        }
    }
}

impl BookingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            alternatives_limit: limit_var("APP_ALTERNATIVES_LIMIT", defaults.alternatives_limit)?,
            availability_default_limit: limit_var(
                "APP_AVAILABILITY_LIMIT",
                defaults.availability_default_limit,
            )?,
            availability_max_limit: limit_var(
                "APP_AVAILABILITY_MAX_LIMIT",
                defaults.availability_max_limit,
            )?,
            inbox_default_limit: limit_var("APP_INBOX_LIMIT", defaults.inbox_default_limit)?,
            inbox_max_limit: limit_var("APP_INBOX_MAX_LIMIT", defaults.inbox_max_limit)?,
        };

        if config.availability_default_limit > config.availability_max_limit {
            return Err(ConfigError::InvalidLimit {
                var: "APP_AVAILABILITY_LIMIT",
            });
        }
        if config.inbox_default_limit > config.inbox_max_limit {
            return Err(ConfigError::InvalidLimit {
                var: "APP_INBOX_LIMIT",
            });
        }

        Ok(config)
    }

    /// Clamp a caller supplied availability limit; zero or missing means the default.
    pub fn availability_limit(&self, requested: Option<usize>) -> usize {
        clamp_limit(
            requested,
            self.availability_default_limit,
            self.availability_max_limit,
        )
    }

    pub fn inbox_limit(&self, requested: Option<usize>) -> usize {
        clamp_limit(requested, self.inbox_default_limit, self.inbox_max_limit)
    }
}

fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    match requested {
        Some(limit) if limit > 0 => limit.min(max),
        _ => default,
    }
}

fn limit_var(var: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidLimit { var }),
        },
        Err(_) => Ok(default),
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { var }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLimit { var: &'static str },
    InvalidFlag { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLimit { var } => {
                write!(f, "{var} must be a positive integer within its maximum")
            }
            ConfigError::InvalidFlag { var } => write!(f, "{var} must be true or false"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLimit { .. }
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}

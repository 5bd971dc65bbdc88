//! Configuration module
//!
//! Configuration is read from the process environment (optionally seeded from a
//! `.env` file) once at startup. Every value has a default; the detector
//! command defaults to the bundled `scripts/face_detector.py`.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_DETECTOR_COMMAND, DEFAULT_PORT, DEFAULT_UPLOAD_DIR, DEFAULT_URL_EXPIRY_MINUTES,
    MAX_URL_EXPIRY_MINUTES, MIN_TOKEN_SECRET_LEN,
};

const MAX_FILE_SIZE_MB: usize = 10;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Server-level configuration
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub http_concurrency_limit: usize,
    pub log_format: String,
}

/// Image service configuration
#[derive(Clone, Debug)]
pub struct ImageServiceConfig {
    pub base: BaseConfig,
    /// Base URL used to build published image links (no trailing slash).
    pub public_base_url: String,
    /// Lifetime of published image links, in minutes.
    pub url_expiry_minutes: u64,
    pub upload_dir: PathBuf,
    pub max_file_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    /// HMAC secret for access tokens. `None` means a random per-process secret.
    pub token_secret: Option<String>,
    /// Program and arguments of the external face detector.
    pub detector_command: Vec<String>,
    pub detector_workdir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ImageServiceConfig>);

impl Config {
    fn inner(&self) -> &ImageServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ImageServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().base.http_concurrency_limit
    }

    pub fn log_format(&self) -> &str {
        &self.inner().base.log_format
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }

    pub fn url_expiry_minutes(&self) -> u64 {
        self.inner().url_expiry_minutes
    }

    /// Lifetime of published image links.
    pub fn url_expiry(&self) -> chrono::Duration {
        i64::try_from(self.inner().url_expiry_minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or_else(|| chrono::Duration::minutes(DEFAULT_URL_EXPIRY_MINUTES as i64))
    }

    pub fn upload_dir(&self) -> &std::path::Path {
        &self.inner().upload_dir
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.inner().allowed_content_types
    }

    pub fn token_secret(&self) -> Option<&str> {
        self.inner().token_secret.as_deref()
    }

    pub fn detector_command(&self) -> &[String] {
        &self.inner().detector_command
    }

    pub fn detector_workdir(&self) -> Option<&std::path::Path> {
        self.inner().detector_workdir.as_deref()
    }
}

fn is_production_environment(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

/// Parse the link lifetime in minutes. Absent, unparsable, zero and values
/// above [`MAX_URL_EXPIRY_MINUTES`] fall back to [`DEFAULT_URL_EXPIRY_MINUTES`].
pub fn parse_url_expiry_minutes(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|minutes| (1..=MAX_URL_EXPIRY_MINUTES).contains(minutes))
        .unwrap_or(DEFAULT_URL_EXPIRY_MINUTES)
}

/// Convert `MAX_FILE_SIZE_MB` to bytes. Absent or unparsable values use the
/// default; sizes that do not fit in memory addressing are rejected.
pub fn parse_max_file_size_bytes(raw: Option<&str>) -> Result<usize, anyhow::Error> {
    let megabytes = raw
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(MAX_FILE_SIZE_MB);

    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large: {}", megabytes))
}

/// Split a command line on whitespace. Quoting is not supported.
pub fn parse_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(|s| s.to_string()).collect()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ImageServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port,
            environment,
            cors_origins,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "compact".to_string())
                .to_lowercase(),
        };

        let max_file_size_bytes =
            parse_max_file_size_bytes(env::var("MAX_FILE_SIZE_MB").ok().as_deref())?;

        let detector_command = parse_command(
            &env::var("DETECTOR_COMMAND").unwrap_or_else(|_| DEFAULT_DETECTOR_COMMAND.to_string()),
        );

        let config = ImageServiceConfig {
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
            url_expiry_minutes: parse_url_expiry_minutes(env::var("URL_EXPIRY").ok().as_deref()),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string())
                .into(),
            max_file_size_bytes,
            allowed_content_types: parse_list(
                &env::var("ALLOWED_CONTENT_TYPES")
                    .unwrap_or_else(|_| "image/jpeg,image/png".to_string()),
            ),
            token_secret: env::var("TOKEN_SECRET").ok().filter(|s| !s.is_empty()),
            detector_command,
            detector_workdir: env::var("DETECTOR_WORKDIR").ok().map(PathBuf::from),
            base,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let is_production = is_production_environment(&self.base.environment);

        if is_production && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.detector_command.is_empty() {
            return Err(anyhow::anyhow!("DETECTOR_COMMAND must not be empty"));
        }

        match self.token_secret.as_deref() {
            Some(secret) if secret.len() < MIN_TOKEN_SECRET_LEN => {
                return Err(anyhow::anyhow!(
                    "TOKEN_SECRET must be at least {} characters long",
                    MIN_TOKEN_SECRET_LEN
                ));
            }
            None if is_production => {
                return Err(anyhow::anyhow!("TOKEN_SECRET must be set in production"));
            }
            _ => {}
        }

        if !(1..=MAX_URL_EXPIRY_MINUTES).contains(&self.url_expiry_minutes) {
            return Err(anyhow::anyhow!(
                "URL_EXPIRY must be between 1 and {} minutes",
                MAX_URL_EXPIRY_MINUTES
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB cannot be 0"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_CONTENT_TYPES cannot be empty"));
        }

        if !self.public_base_url.starts_with("http://")
            && !self.public_base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "PUBLIC_BASE_URL must start with http:// or https://"
            ));
        }

        Ok(())
    }
}

//! Configuration validation
//!
//! Checks that need the filesystem or the process environment, on top of the
//! value checks done by `Config::validate`.

use anyhow::Result;
use facetally_core::Config;

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let is_production = config.is_production();
    let env_var = std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .ok();
    if !is_production && env_var.is_none() {
        tracing::debug!("ENVIRONMENT/APP_ENV not set, error details will be included in responses");
    }

    if let Some(workdir) = config.detector_workdir() {
        if !workdir.is_dir() {
            return Err(anyhow::anyhow!(
                "DETECTOR_WORKDIR {} is not a directory",
                workdir.display()
            ));
        }
    }

    if config.token_secret().is_none() {
        tracing::warn!("TOKEN_SECRET not set, a random secret will be generated for this process");
    }

    tracing::info!(
        url_expiry_minutes = config.url_expiry_minutes(),
        max_file_size_mb = config.max_file_size_bytes() / 1024 / 1024,
        allowed_content_types = %config.allowed_content_types().join(","),
        detector = %config.detector_command().join(" "),
        "Configuration summary"
    );

    Ok(())
}

use crate::error::{AppError, Result};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8042;
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
pub const MIN_SECRET_LEN: usize = 16;

const PAYMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated runtime settings for the HTTP service.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub session_secret: String,
    pub webhook_secret: String,
    /// Intent-creation endpoint. `None` selects the simulated gateway.
    pub payment_endpoint: Option<String>,
    pub payment_timeout: Duration,
    pub demo_mode: bool,
    pub webhook_tolerance: Duration,
}

impl Config {
    pub fn new(
        port: u16,
        session_secret: String,
        webhook_secret: String,
        payment_endpoint: Option<String>,
        demo_mode: bool,
        webhook_tolerance_secs: u64,
    ) -> Result<Self> {
        check_secret("session secret", &session_secret)?;
        check_secret("webhook secret", &webhook_secret)?;

        let payment_endpoint = payment_endpoint
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        if let Some(endpoint) = &payment_endpoint
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(AppError::validation(format!(
                "payment endpoint must be an http(s) URL, got {endpoint}"
            )));
        }

        Ok(Self {
            port,
            session_secret,
            webhook_secret,
            payment_endpoint,
            payment_timeout: PAYMENT_TIMEOUT,
            demo_mode,
            webhook_tolerance: Duration::from_secs(webhook_tolerance_secs),
        })
    }
}

pub fn check_secret(name: &str, value: &str) -> Result<()> {
    if value.len() < MIN_SECRET_LEN {
        return Err(AppError::validation(format!(
            "{name} must be at least {MIN_SECRET_LEN} bytes"
        )));
    }
    Ok(())
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check backend base URLs are absolute http(s)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: '{value}' is not an absolute http(s) URL")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: only plain http is supported, got '{value}'")]
    PlainHttpOnly { field: &'static str, value: String },

    #[error("assets: 'upstream' and 'root' are mutually exclusive")]
    ConflictingAssetHosts,
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if let Some(spaces_url) = &config.storage.spaces_url {
        check_url(&mut errors, "storage.spaces_url", spaces_url);
    }
    if let Some(upstream) = &config.assets.upstream {
        check_url(&mut errors, "assets.upstream", upstream);
        if upstream.starts_with("https://") {
            errors.push(ValidationError::PlainHttpOnly {
                field: "assets.upstream",
                value: upstream.clone(),
            });
        }
    }
    if let Some(origin) = &config.cache.public_origin {
        check_url(&mut errors, "cache.public_origin", origin);
    }
    if config.assets.upstream.is_some() && config.assets.root.is_some() {
        errors.push(ValidationError::ConflictingAssetHosts);
    }

    let positive = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.backend_fetch_secs", config.timeouts.backend_fetch_secs),
        ("timeouts.shutdown_grace_secs", config.timeouts.shutdown_grace_secs),
        ("cache.max_entries", config.cache.max_entries as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}

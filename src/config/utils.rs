// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{BusKind, Config, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./hodr_gateway --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Check that a string is a valid D-Bus well-known bus name
///
/// At least two dot-separated elements, each made of `[A-Za-z0-9_-]` and not
/// starting with a digit, 255 characters at most.
pub fn is_valid_bus_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 255 || name.starts_with(':') {
        return false;
    }
    let elements: Vec<&str> = name.split('.').collect();
    elements.len() >= 2
        && elements.iter().all(|element| {
            !element.is_empty()
                && !element.starts_with(|c: char| c.is_ascii_digit())
                && element
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

/// Check that a string is a valid D-Bus object path
pub fn is_valid_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    path.starts_with('/')
        && !path.ends_with('/')
        && path[1..].split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Port Range**: the HTTP port must be within 1-65534
/// - **IP Address Format**: a doubtful listener address is only reported
/// - **Bus Address**: `bus: address` and `bus: peer` require a non-empty `bus_address`
/// - **Names**: the service name and object path must be valid D-Bus names
/// - **Timings**: call timeout, backoff and health-check period must be non-zero
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.server.port < 1 || config.server.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.server.port);
    }

    if !is_valid_ip_address(&config.server.address) {
        debug!(
            "Potentially invalid address format: {}",
            config.server.address
        );
    }

    let control = &config.control;
    if matches!(control.bus, BusKind::Address | BusKind::Peer)
        && control
            .bus_address
            .as_deref()
            .map_or(true, |address| address.trim().is_empty())
    {
        anyhow::bail!(
            "control.bus is '{}' but control.bus_address is not set",
            if control.bus == BusKind::Peer { "peer" } else { "address" }
        );
    }

    if !is_valid_bus_name(&control.service_name) {
        anyhow::bail!("Invalid D-Bus service name: {}", control.service_name);
    }

    if !is_valid_object_path(&control.object_path) {
        anyhow::bail!("Invalid D-Bus object path: {}", control.object_path);
    }

    if control.call_timeout_ms == 0 {
        anyhow::bail!("control.call_timeout_ms must be greater than zero");
    }
    if control.reconnect_attempts == 0 {
        anyhow::bail!("control.reconnect_attempts must be at least 1");
    }
    if control.health_check_interval_ms == 0 {
        anyhow::bail!("control.health_check_interval_ms must be greater than zero");
    }

    Ok(())
}

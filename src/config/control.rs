// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Control object connection configuration
//!
//! This module defines how the gateway reaches the `hodr.server.Control`
//! D-Bus object, and the bounded-wait and reconnection policy applied to
//! every remote operation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Well-known bus name, object path segment and interface of the control object.
pub const DEFAULT_SERVICE_NAME: &str = "hodr.server.Control";
/// Object path the control object is exported on.
pub const DEFAULT_OBJECT_PATH: &str = "/hodr/server/Control";

/// Which implementation of the control client is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlBackend {
    /// Real instrument reached over D-Bus
    Dbus,
    /// In-memory simulated instrument, for development without hardware
    Mock,
}

/// Which message bus the D-Bus backend connects to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    Session,
    System,
    /// Explicit bus address taken from `bus_address`
    Address,
    /// Direct peer-to-peer connection to `bus_address`, without a bus daemon
    Peer,
}

/// Configuration of the control client.
///
/// # Example
///
/// ```
/// use hodr_gateway::config::{ControlBackend, ControlConfig};
///
/// let control = ControlConfig {
///     backend: ControlBackend::Mock,
///     ..Default::default()
/// };
/// assert_eq!(control.call_timeout().as_millis(), 5000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Control client implementation. Default is `dbus`.
    #[serde(default = "default_backend")]
    pub backend: ControlBackend,

    /// Message bus to connect to. Default is the session bus.
    #[serde(default = "default_bus")]
    pub bus: BusKind,

    /// Bus address, only used when `bus` is `address` or `peer`
    /// (e.g. `unix:path=/run/user/1000/bus`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus_address: Option<String>,

    /// Well-known name owned by the control daemon.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Object path of the control object.
    #[serde(default = "default_object_path")]
    pub object_path: String,

    /// Upper bound for a single property read or method call, in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Connection attempts made before an operation fails as unreachable.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Delay before the first reconnection retry, doubled after each failure.
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,

    /// Period of the background session health check, in milliseconds.
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bus: default_bus(),
            bus_address: None,
            service_name: default_service_name(),
            object_path: default_object_path(),
            call_timeout_ms: default_call_timeout_ms(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            health_check_interval_ms: default_health_check_interval_ms(),
        }
    }
}

impl ControlConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    /// Longest time a full reconnection cycle may take: every attempt
    /// timing out plus the doubling sleeps between attempts.
    ///
    /// ```
    /// use hodr_gateway::config::ControlConfig;
    ///
    /// let control = ControlConfig {
    ///     call_timeout_ms: 300,
    ///     reconnect_attempts: 3,
    ///     reconnect_backoff_ms: 50,
    ///     ..Default::default()
    /// };
    /// // 3 x 300 ms + 50 ms + 100 ms
    /// assert_eq!(control.reconnect_budget().as_millis(), 1050);
    /// ```
    pub fn reconnect_budget(&self) -> Duration {
        let mut budget = self.call_timeout().saturating_mul(self.reconnect_attempts);
        let mut backoff = self.reconnect_backoff();
        for _ in 1..self.reconnect_attempts {
            budget = budget.saturating_add(backoff);
            backoff = backoff.saturating_mul(2);
        }
        budget
    }
}

fn default_backend() -> ControlBackend {
    ControlBackend::Dbus
}

fn default_bus() -> BusKind {
    BusKind::Session
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_object_path() -> String {
    DEFAULT_OBJECT_PATH.to_string()
}

fn default_call_timeout_ms() -> u64 {
    5000
}

fn default_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_backoff_ms() -> u64 {
    200
}

fn default_health_check_interval_ms() -> u64 {
    10_000
}

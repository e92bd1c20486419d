// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Instrument control client
//!
//! This module provides the typed interface to the `hodr.server.Control`
//! object that owns the spectrometer and its temperature regulation:
//! - [`ControlClient`]: one async method per property or method of the control object
//! - [`DbusControlClient`]: the real implementation, talking D-Bus through zbus
//! - [`MockControlClient`]: an in-memory instrument for development and tests
//!
//! Every remote operation is bounded by the configured call timeout, so a
//! hung control daemon surfaces as [`ControlError::Timeout`] instead of
//! blocking the HTTP listener.

pub mod dbus;
pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ControlBackend, ControlConfig};

pub use dbus::DbusControlClient;
pub use mock::{ControlCall, MockControlClient, MockFailure};

/// Errors reported by a [`ControlClient`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// The bus or the control object cannot be reached
    #[error("Control object unreachable: {0}")]
    Connection(String),

    #[error("Unknown property '{0}'")]
    PropertyNotFound(String),

    #[error("Operation '{operation}' timed out after {after:?}")]
    Timeout {
        operation: String,
        after: Duration,
    },

    #[error("Operation '{operation}' failed: {reason}")]
    CallFailed { operation: String, reason: String },

    #[error("Malformed reply to '{operation}': {reason}")]
    MalformedReply { operation: String, reason: String },

    /// The control object reported that the requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ControlError {
    /// Whether the error means the session is unusable and must be rebuilt
    pub fn is_transport(&self) -> bool {
        matches!(self, ControlError::Connection(_))
    }
}

pub type ControlResult<T> = std::result::Result<T, ControlError>;

/// Control client shared between the HTTP handlers and the background tasks
pub type SharedControlClient = Arc<dyn ControlClient>;

/// Acquisition strategy requested from the instrument
///
/// The numeric codes are the ones the control object expects in
/// `start_acquisition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionMode {
    #[default]
    None,
    Single,
    Series,
    Continuous,
}

impl AcquisitionMode {
    /// Map a mode name to a mode
    ///
    /// Matching is exact and case-sensitive. Any other name, including an
    /// empty one, selects [`AcquisitionMode::None`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "single" => AcquisitionMode::Single,
            "series" => AcquisitionMode::Series,
            "continuous" => AcquisitionMode::Continuous,
            _ => AcquisitionMode::None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            AcquisitionMode::None => 0,
            AcquisitionMode::Single => 1,
            AcquisitionMode::Series => 3,
            AcquisitionMode::Continuous => 5,
        }
    }
}

/// Parameters of an acquisition start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionRequest {
    /// Integration time, `-1` lets the instrument choose
    pub integration_time: f64,
    /// Delay between captures, `-1` lets the instrument choose
    pub interval_time: f64,
    pub mode: AcquisitionMode,
    pub capture_count: u32,
}

impl Default for AcquisitionRequest {
    fn default() -> Self {
        Self {
            integration_time: -1.0,
            interval_time: -1.0,
            mode: AcquisitionMode::None,
            capture_count: 1,
        }
    }
}

/// One captured spectrum as returned by `get_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRecord {
    pub timestamp: String,
    pub integration_time: f64,
    pub temperature: f64,
    pub data: Vec<i32>,
}

/// Snapshot of every property exposed by the control object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentState {
    pub active: bool,
    pub temperature: f64,
    pub target_temperature: f64,
    pub temperature_status: String,
    pub number_spectra: u32,
    pub acquisition_status: i32,
    pub data_ready: bool,
    pub data_path: String,
}

impl Default for InstrumentState {
    fn default() -> Self {
        Self {
            active: false,
            temperature: 21.5,
            target_temperature: -70.0,
            temperature_status: "Idle".to_string(),
            number_spectra: 0,
            acquisition_status: 0,
            data_ready: false,
            data_path: String::new(),
        }
    }
}

/// Typed client of the `hodr.server.Control` object
///
/// Property readers return the value currently published by the control
/// object. Mutating methods are a single round-trip each.
#[async_trait]
pub trait ControlClient: Send + Sync {
    /// Short name of the implementation, reported by `/health`
    fn backend_name(&self) -> &'static str;

    /// Establish the session if it is not already up
    async fn connect(&self) -> ControlResult<()>;

    /// Check that the control object answers
    async fn health_check(&self) -> ControlResult<()>;

    async fn active(&self) -> ControlResult<bool>;
    async fn temperature(&self) -> ControlResult<f64>;
    async fn target_temperature(&self) -> ControlResult<f64>;
    async fn temperature_status(&self) -> ControlResult<String>;
    async fn number_spectra(&self) -> ControlResult<u32>;
    async fn acquisition_status(&self) -> ControlResult<i32>;
    async fn data_ready(&self) -> ControlResult<bool>;
    async fn data_path(&self) -> ControlResult<String>;

    async fn stop_acquisition(&self) -> ControlResult<()>;
    async fn activate(&self) -> ControlResult<bool>;
    async fn deactivate(&self) -> ControlResult<bool>;
    async fn reset(&self) -> ControlResult<bool>;

    /// Set the regulation target, in whole degrees Celsius
    async fn set_temperature(&self, target: i32) -> ControlResult<bool>;

    /// Start an acquisition and return the identifier of the first spectrum
    async fn start_acquisition(&self, request: &AcquisitionRequest) -> ControlResult<i32>;

    /// Fetch the latest spectrum
    async fn get_data(&self) -> ControlResult<SpectrumRecord>;
}

/// Create the control client selected by the configuration
pub fn create_client(config: &ControlConfig) -> SharedControlClient {
    match config.backend {
        ControlBackend::Dbus => Arc::new(DbusControlClient::new(config.clone())),
        ControlBackend::Mock => Arc::new(MockControlClient::new()),
    }
}

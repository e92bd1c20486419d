// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::control::{ControlClient, ControlResult};

/// Power state derived from the `active` property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerStatus {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl From<bool> for PowerStatus {
    fn from(active: bool) -> Self {
        if active {
            PowerStatus::On
        } else {
            PowerStatus::Off
        }
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerStatus::On => write!(f, "ON"),
            PowerStatus::Off => write!(f, "OFF"),
        }
    }
}

/// Aggregate served on `/status`
///
/// Field order is the JSON key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub power_status: PowerStatus,
    pub temperature: f64,
    pub target_temperature: f64,
    pub temperature_status: String,
    pub number_spectra: u32,
    pub acquisition_status: i32,
}

impl StatusReport {
    /// Read the six properties making up the report
    ///
    /// The first failing read aborts the report.
    pub async fn read(client: &dyn ControlClient) -> ControlResult<Self> {
        let (
            active,
            temperature,
            target_temperature,
            temperature_status,
            number_spectra,
            acquisition_status,
        ) = tokio::try_join!(
            client.active(),
            client.temperature(),
            client.target_temperature(),
            client.temperature_status(),
            client.number_spectra(),
            client.acquisition_status(),
        )?;

        Ok(Self {
            power_status: active.into(),
            temperature,
            target_temperature,
            temperature_status,
            number_spectra,
            acquisition_status,
        })
    }
}

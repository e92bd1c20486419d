// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated control object
//!
//! [`MockControlClient`] keeps an [`InstrumentState`] in memory and applies
//! the effect of each call to it, so the gateway can run without the
//! spectrometer daemon. Every call is recorded, which lets tests assert the
//! exact arguments forwarded by the HTTP layer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use log::debug;

use super::{
    AcquisitionRequest, ControlClient, ControlError, ControlResult, InstrumentState,
    SpectrumRecord,
};

/// Number of samples in a simulated spectrum
const MOCK_SPECTRUM_LENGTH: usize = 64;

/// Calls kept in the log; older ones are discarded
pub const MOCK_CALL_LOG_CAPACITY: usize = 256;

/// Call received by the mock, with its wire arguments
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCall {
    StopAcquisition,
    Activate,
    Deactivate,
    Reset,
    SetTemperature(i32),
    StartAcquisition {
        integration_time: f64,
        interval_time: f64,
        mode: u32,
        n_captures: u32,
    },
    GetData,
}

/// Failure the mock reports for every operation while it is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Behave as if the bus or the object were gone
    Unreachable,
    /// Behave as if the object never answered
    Timeout,
    /// Reject calls with a remote error
    CallFault,
}

#[derive(Debug, Default)]
struct MockInner {
    state: InstrumentState,
    calls: VecDeque<ControlCall>,
    last_spectrum: Option<SpectrumRecord>,
    failure: Option<MockFailure>,
}

impl MockInner {
    fn record(&mut self, call: ControlCall) {
        if self.calls.len() == MOCK_CALL_LOG_CAPACITY {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }
}

/// In-memory implementation of [`ControlClient`]
///
/// Clones share the same simulated instrument.
#[derive(Debug, Clone, Default)]
pub struct MockControlClient {
    inner: Arc<Mutex<MockInner>>,
}

impl MockControlClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock exposing the given property values
    pub fn with_state(state: InstrumentState) -> Self {
        let mock = Self::new();
        mock.lock().state = state;
        mock
    }

    /// Current property values
    pub fn state(&self) -> InstrumentState {
        self.lock().state.clone()
    }

    /// Replace the property values
    pub fn set_state(&self, state: InstrumentState) {
        self.lock().state = state;
    }

    /// Latest calls received, oldest first, at most [`MOCK_CALL_LOG_CAPACITY`]
    pub fn calls(&self) -> Vec<ControlCall> {
        self.lock().calls.iter().cloned().collect()
    }

    /// Drain the call log
    pub fn take_calls(&self) -> Vec<ControlCall> {
        self.lock().calls.drain(..).collect()
    }

    /// Make every following operation fail, or succeed again with `None`
    pub fn set_failure(&self, failure: Option<MockFailure>) {
        self.lock().failure = failure;
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        // State stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock the simulation, or fail the way the injected failure dictates
    fn enter(&self, operation: &str) -> ControlResult<MutexGuard<'_, MockInner>> {
        let inner = self.lock();
        match inner.failure {
            None => Ok(inner),
            Some(MockFailure::Unreachable) => Err(ControlError::Connection(
                "simulated instrument is offline".to_string(),
            )),
            Some(MockFailure::Timeout) => Err(ControlError::Timeout {
                operation: operation.to_string(),
                after: Duration::from_millis(5000),
            }),
            Some(MockFailure::CallFault) => Err(ControlError::CallFailed {
                operation: operation.to_string(),
                reason: "simulated fault".to_string(),
            }),
        }
    }

    fn read<T>(&self, operation: &str, f: impl FnOnce(&InstrumentState) -> T) -> ControlResult<T> {
        let inner = self.enter(operation)?;
        Ok(f(&inner.state))
    }
}

/// Gaussian-shaped spectrum centred on the middle channel, scaled by integration time
fn synthesize_spectrum(integration_time: f64) -> Vec<i32> {
    let gain = if integration_time > 0.0 {
        integration_time
    } else {
        1.0
    };
    let centre = MOCK_SPECTRUM_LENGTH as f64 / 2.0;
    (0..MOCK_SPECTRUM_LENGTH)
        .map(|i| {
            let x = (i as f64 - centre) / 8.0;
            (1000.0 * gain * (-x * x).exp()).round() as i32 + 100
        })
        .collect()
}

#[async_trait]
impl ControlClient for MockControlClient {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self) -> ControlResult<()> {
        self.enter("connect").map(|_| ())
    }

    async fn health_check(&self) -> ControlResult<()> {
        self.enter("ping").map(|_| ())
    }

    async fn active(&self) -> ControlResult<bool> {
        self.read("active", |s| s.active)
    }

    async fn temperature(&self) -> ControlResult<f64> {
        self.read("Temperature", |s| s.temperature)
    }

    async fn target_temperature(&self) -> ControlResult<f64> {
        self.read("TargetTemperature", |s| s.target_temperature)
    }

    async fn temperature_status(&self) -> ControlResult<String> {
        self.read("TemperatureStatus", |s| s.temperature_status.clone())
    }

    async fn number_spectra(&self) -> ControlResult<u32> {
        self.read("numberSpectra", |s| s.number_spectra)
    }

    async fn acquisition_status(&self) -> ControlResult<i32> {
        self.read("acquisitionStatus", |s| s.acquisition_status)
    }

    async fn data_ready(&self) -> ControlResult<bool> {
        self.read("dataReady", |s| s.data_ready)
    }

    async fn data_path(&self) -> ControlResult<String> {
        self.read("dataPath", |s| s.data_path.clone())
    }

    async fn stop_acquisition(&self) -> ControlResult<()> {
        let mut inner = self.enter("stop_acquisition")?;
        inner.record(ControlCall::StopAcquisition);
        inner.state.acquisition_status = 0;
        debug!("Mock acquisition stopped");
        Ok(())
    }

    async fn activate(&self) -> ControlResult<bool> {
        let mut inner = self.enter("activate")?;
        inner.record(ControlCall::Activate);
        inner.state.active = true;
        inner.state.temperature_status = "Regulating".to_string();
        Ok(true)
    }

    async fn deactivate(&self) -> ControlResult<bool> {
        let mut inner = self.enter("deactivate")?;
        inner.record(ControlCall::Deactivate);
        inner.state.active = false;
        inner.state.temperature_status = "Idle".to_string();
        Ok(true)
    }

    async fn reset(&self) -> ControlResult<bool> {
        let mut inner = self.enter("reset")?;
        inner.record(ControlCall::Reset);
        let data_path = std::mem::take(&mut inner.state.data_path);
        inner.state = InstrumentState {
            data_path,
            ..InstrumentState::default()
        };
        inner.last_spectrum = None;
        Ok(true)
    }

    async fn set_temperature(&self, target: i32) -> ControlResult<bool> {
        let mut inner = self.enter("set_temperature")?;
        inner.record(ControlCall::SetTemperature(target));
        inner.state.target_temperature = f64::from(target);
        Ok(true)
    }

    async fn start_acquisition(&self, request: &AcquisitionRequest) -> ControlResult<i32> {
        let mut inner = self.enter("start_acquisition")?;
        inner.record(ControlCall::StartAcquisition {
            integration_time: request.integration_time,
            interval_time: request.interval_time,
            mode: request.mode.code(),
            n_captures: request.capture_count,
        });

        let spectrum_id = inner.state.number_spectra;
        let captured = request.capture_count.max(1);
        inner.state.number_spectra = inner.state.number_spectra.saturating_add(captured);
        inner.state.acquisition_status = request.mode.code() as i32;
        inner.state.data_ready = true;
        inner.last_spectrum = Some(SpectrumRecord {
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            integration_time: request.integration_time,
            temperature: inner.state.temperature,
            data: synthesize_spectrum(request.integration_time),
        });

        debug!(
            "Mock acquisition started: mode {}, {} capture(s), first id {}",
            request.mode.code(),
            captured,
            spectrum_id
        );
        Ok(spectrum_id as i32)
    }

    async fn get_data(&self) -> ControlResult<SpectrumRecord> {
        let mut inner = self.enter("get_data")?;
        inner.record(ControlCall::GetData);
        inner
            .last_spectrum
            .clone()
            .ok_or_else(|| ControlError::NotFound("no spectrum acquired yet".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::AcquisitionMode;

    #[tokio::test]
    async fn test_activate_toggles_power() {
        let mock = MockControlClient::new();
        assert!(!mock.active().await.unwrap());
        assert!(mock.activate().await.unwrap());
        assert!(mock.active().await.unwrap());
        assert!(mock.deactivate().await.unwrap());
        assert!(!mock.active().await.unwrap());
        assert_eq!(
            mock.calls(),
            vec![ControlCall::Activate, ControlCall::Deactivate]
        );
    }

    #[tokio::test]
    async fn test_spectrum_lifecycle() {
        let mock = MockControlClient::new();
        assert!(matches!(
            mock.get_data().await,
            Err(ControlError::NotFound(_))
        ));

        let request = AcquisitionRequest {
            integration_time: 0.5,
            interval_time: 1.0,
            mode: AcquisitionMode::Series,
            capture_count: 3,
        };
        assert_eq!(mock.start_acquisition(&request).await.unwrap(), 0);
        assert_eq!(mock.start_acquisition(&request).await.unwrap(), 3);
        assert_eq!(mock.number_spectra().await.unwrap(), 6);
        assert_eq!(mock.acquisition_status().await.unwrap(), 3);

        let record = mock.get_data().await.unwrap();
        assert_eq!(record.integration_time, 0.5);
        assert_eq!(record.data.len(), MOCK_SPECTRUM_LENGTH);

        mock.reset().await.unwrap();
        assert!(mock.get_data().await.is_err());
        assert_eq!(mock.number_spectra().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mock = MockControlClient::new();
        mock.set_failure(Some(MockFailure::Unreachable));
        assert!(mock.temperature().await.unwrap_err().is_transport());

        mock.set_failure(Some(MockFailure::Timeout));
        assert!(matches!(
            mock.activate().await,
            Err(ControlError::Timeout { .. })
        ));
        assert!(mock.calls().is_empty());

        mock.set_failure(None);
        assert!(mock.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_call_log_is_bounded_and_drainable() {
        let mock = MockControlClient::new();
        for target in 0..(MOCK_CALL_LOG_CAPACITY as i32 + 10) {
            mock.set_temperature(target).await.unwrap();
        }

        let calls = mock.calls();
        assert_eq!(calls.len(), MOCK_CALL_LOG_CAPACITY);
        assert_eq!(calls[0], ControlCall::SetTemperature(10));

        assert_eq!(mock.take_calls().len(), MOCK_CALL_LOG_CAPACITY);
        assert!(mock.calls().is_empty());
        mock.reset().await.unwrap();
        assert_eq!(mock.take_calls(), vec![ControlCall::Reset]);
    }
}

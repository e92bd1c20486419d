// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Routes that change the instrument state
//!
//! Parameterless commands are plain GETs. Commands with parameters are POSTs
//! carrying a JSON object, validated in full before the control object is
//! called exactly once.

use log::{debug, info, warn};
use rocket::serde::json::Json;
use rocket::{get, post, State};

use super::requests::{
    parse_acquisition_request, parse_body, parse_spectrum_id, parse_target_temperature,
    ExactPath,
};
use super::responses::{ApiError, PlainText};
use crate::control::{ControlError, SharedControlClient, SpectrumRecord};

#[get("/stop_acquisition")]
pub async fn stop_acquisition(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    info!("Stopping acquisition");
    client.stop_acquisition().await?;
    Ok(PlainText::new("Acquisition stopped successfully"))
}

#[get("/activate")]
pub async fn activate(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    info!("Activating device");
    let accepted = client.activate().await?;
    debug!("activate returned {}", accepted);
    Ok(PlainText::new("Device activated successfully"))
}

#[get("/deactivate")]
pub async fn deactivate(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    info!("Deactivating device");
    let accepted = client.deactivate().await?;
    debug!("deactivate returned {}", accepted);
    Ok(PlainText::new("Device deactivated successfully"))
}

#[get("/reset")]
pub async fn reset(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    info!("Resetting device");
    let accepted = client.reset().await?;
    debug!("reset returned {}", accepted);
    Ok(PlainText::new("Device reset successfully"))
}

#[post("/set_target_temperature", data = "<body>")]
pub async fn set_target_temperature(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
    body: String,
) -> Result<PlainText, ApiError> {
    let object = parse_body(&body)?;
    let target = parse_target_temperature(&object)?;
    info!("Setting target temperature to {}", target);
    client.set_temperature(target).await?;
    Ok(PlainText::new("Target temperature set successfully"))
}

#[post("/start_acquisition", data = "<body>")]
pub async fn start_acquisition(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
    body: String,
) -> Result<PlainText, ApiError> {
    let object = parse_body(&body)?;
    let request = parse_acquisition_request(&object)?;
    info!(
        "Starting acquisition: integration {}, interval {}, mode {}, {} capture(s)",
        request.integration_time,
        request.interval_time,
        request.mode.code(),
        request.capture_count
    );
    let spectrum_id = client.start_acquisition(&request).await?;
    Ok(PlainText(spectrum_id.to_string()))
}

/// Latest spectrum
///
/// `spectrum_id` is validated but the control object always returns its
/// latest spectrum.
#[post("/get_spectrum", data = "<body>")]
pub async fn get_spectrum(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
    body: String,
) -> Result<Json<SpectrumRecord>, ApiError> {
    let object = parse_body(&body)?;
    let spectrum_id = parse_spectrum_id(&object)?;
    info!("Fetching spectrum (requested id {})", spectrum_id);
    match client.get_data().await {
        Ok(record) => Ok(Json(record)),
        Err(ControlError::NotFound(reason)) => {
            warn!("No spectrum available: {}", reason);
            Err(ApiError::not_found("Spectrum not found"))
        }
        Err(e) => Err(e.into()),
    }
}

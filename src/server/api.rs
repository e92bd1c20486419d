// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Read-only routes
//!
//! Each route reads one or more properties of the control object and renders
//! them as plain text or JSON. Nothing is cached in the gateway.

use std::sync::Arc;

use log::{debug, info};
use rocket::http::ContentType;
use rocket::serde::json::Json;
use rocket::{get, State};
use serde::Serialize;

use super::requests::ExactPath;
use super::responses::{ApiError, PlainText};
use crate::config::Config;
use crate::control::{ControlResult, SharedControlClient};
use crate::formatting::{
    load_data_file, resolve_data_path, PowerStatus, PropertyText, StatusReport,
};

fn property_text<T: PropertyText>(
    name: &str,
    value: ControlResult<T>,
) -> Result<PlainText, ApiError> {
    let text = value?.to_property_text();
    debug!("{} = {}", name, text);
    Ok(PlainText(text))
}

#[get("/status")]
pub async fn status(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<Json<StatusReport>, ApiError> {
    info!("Serving status");
    let report = StatusReport::read(client.inner().as_ref()).await?;
    Ok(Json(report))
}

#[get("/temperature")]
pub async fn temperature(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    property_text("Temperature", client.temperature().await)
}

#[get("/target_temperature")]
pub async fn target_temperature(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    property_text("TargetTemperature", client.target_temperature().await)
}

#[get("/temperature_status")]
pub async fn temperature_status(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    property_text("TemperatureStatus", client.temperature_status().await)
}

#[get("/data_ready")]
pub async fn data_ready(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    property_text("dataReady", client.data_ready().await)
}

#[get("/number_spectra")]
pub async fn number_spectra(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    property_text("numberSpectra", client.number_spectra().await)
}

#[get("/acquisition_status")]
pub async fn acquisition_status(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    property_text("acquisitionStatus", client.acquisition_status().await)
}

#[get("/power_status")]
pub async fn power_status(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Result<PlainText, ApiError> {
    let power = PowerStatus::from(client.active().await?);
    debug!("Power status: {}", power);
    Ok(PlainText(power.to_string()))
}

/// Annotated data file
///
/// The file is read in full and served with a synthesized header line.
#[get("/data")]
pub async fn data(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
    config: &State<Arc<Config>>,
) -> Result<(ContentType, String), ApiError> {
    let reported = client.data_path().await?;
    info!("Serving data file {}", reported);
    let path = resolve_data_path(&config.data.base_dir, &reported)?;
    let annotated = load_data_file(&path).await?;
    Ok((ContentType::Plain, annotated))
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
    pub control_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness of the gateway and reachability of the control object
///
/// Always answers 200; `status` is `degraded` when the control object does
/// not answer.
#[get("/health")]
pub async fn health(
    _exact: ExactPath,
    client: &State<SharedControlClient>,
) -> Json<HealthReport> {
    let check = client.health_check().await;
    let error = check.err().map(|e| e.to_string());
    Json(HealthReport {
        status: if error.is_none() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        backend: client.backend_name(),
        control_reachable: error.is_none(),
        error,
    })
}

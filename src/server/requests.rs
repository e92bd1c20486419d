// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request guards and decoding of POST bodies
//!
//! Routes match their path exactly: a query string makes the request an
//! unknown path (see [`ExactPath`]).
//!
//! Bodies are JSON objects. Numbers are coerced permissively: JSON numbers,
//! numeric strings and booleans are accepted, and floats are truncated
//! toward zero where an integer is needed. A `null` member counts as absent.
//! Everything is validated before the control object is contacted.

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use serde_json::{Map, Value};

use super::responses::ApiError;
use crate::control::{AcquisitionMode, AcquisitionRequest};

pub type JsonObject = Map<String, Value>;

/// Guard accepting only requests whose URI carries no query string
///
/// Requests with a query are forwarded with `404`, so they end in the
/// not-found catcher like any other unknown path.
#[derive(Debug, Clone, Copy)]
pub struct ExactPath;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ExactPath {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if request.uri().query().is_some() {
            Outcome::Forward(Status::NotFound)
        } else {
            Outcome::Success(ExactPath)
        }
    }
}

/// Parse a request body; an empty body is an empty object
pub fn parse_body(body: &str) -> Result<JsonObject, ApiError> {
    if body.trim().is_empty() {
        return Ok(JsonObject::new());
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        _ => Err(ApiError::bad_request("Malformed JSON body")),
    }
}

/// Integer view of a JSON value
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if let Some(u) = n.as_u64() {
                i64::try_from(u).ok()
            } else {
                n.as_f64().and_then(truncate)
            }
        }
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Float view of a JSON value
pub fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    let t = f.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

fn member<'a>(object: &'a JsonObject, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

/// `target_temperature` of a `/set_target_temperature` body
pub fn parse_target_temperature(object: &JsonObject) -> Result<i32, ApiError> {
    let value = member(object, "target_temperature")
        .ok_or_else(|| ApiError::bad_request("Missing target_temperature in request"))?;
    coerce_int(value)
        .and_then(|t| i32::try_from(t).ok())
        .ok_or_else(|| ApiError::bad_request("Invalid temperature value"))
}

/// Acquisition parameters of a `/start_acquisition` body
pub fn parse_acquisition_request(object: &JsonObject) -> Result<AcquisitionRequest, ApiError> {
    let mut request = AcquisitionRequest::default();

    if let Some(value) = member(object, "integration_time") {
        request.integration_time = coerce_float(value)
            .ok_or_else(|| ApiError::bad_request("Invalid integration time value"))?;
    }

    if let Some(value) = member(object, "interval_time") {
        request.interval_time = coerce_float(value)
            .ok_or_else(|| ApiError::bad_request("Invalid interval time value"))?;
    }

    // Unknown or non-string modes select no particular mode
    request.mode = member(object, "acquisition_mode")
        .and_then(Value::as_str)
        .map(AcquisitionMode::from_name)
        .unwrap_or_default();

    if let Some(value) = member(object, "n_captures") {
        request.capture_count = coerce_int(value)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| ApiError::bad_request("Invalid number of captures value"))?;
    }

    Ok(request)
}

/// `spectrum_id` of a `/get_spectrum` body, `-1` when absent
pub fn parse_spectrum_id(object: &JsonObject) -> Result<i32, ApiError> {
    match member(object, "spectrum_id") {
        None => Ok(-1),
        Some(value) => coerce_int(value)
            .and_then(|id| i32::try_from(id).ok())
            .ok_or_else(|| ApiError::bad_request("Invalid spectrum ID value")),
    }
}

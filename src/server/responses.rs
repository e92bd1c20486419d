// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Response types shared by the gateway routes
//!
//! Plain-text bodies always end with exactly one newline. Errors are plain
//! text too, with the HTTP status chosen from the failure category.

use std::io::Cursor;

use log::{error, warn};
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};

use crate::control::ControlError;
use crate::formatting::DataFileError;

/// `text/plain` body terminated by a newline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainText(pub String);

impl PlainText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl<'r> Responder<'r, 'static> for PlainText {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut body = self.0;
        body.push('\n');
        Response::build()
            .header(ContentType::Plain)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

/// Error answered to the HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: Status,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Status::NotFound, message)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut body = self.message;
        body.push('\n');
        Response::build()
            .status(self.status)
            .header(ContentType::Plain)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        let status = match &err {
            ControlError::Timeout { .. } => Status::GatewayTimeout,
            ControlError::NotFound(_) => Status::NotFound,
            ControlError::Connection(_)
            | ControlError::PropertyNotFound(_)
            | ControlError::CallFailed { .. }
            | ControlError::MalformedReply { .. } => Status::BadGateway,
        };
        warn!("Control operation failed ({}): {}", status.code, err);
        Self::new(status, err.to_string())
    }
}

impl From<DataFileError> for ApiError {
    fn from(err: DataFileError) -> Self {
        match &err {
            DataFileError::EmptyPath => {
                warn!("Data file path is empty");
                Self::not_found("Data path is empty")
            }
            DataFileError::OutsideDataDir(_) => {
                warn!("{}", err);
                Self::not_found("Data path is outside the data directory")
            }
            DataFileError::Missing(_) => {
                warn!("{}", err);
                Self::not_found("Data file does not exist")
            }
            DataFileError::Decode(_) => {
                error!("{}", err);
                Self::new(Status::InternalServerError, "Error decoding data file")
            }
            DataFileError::Io { .. } => {
                error!("{}", err);
                Self::new(Status::InternalServerError, "Error reading data file")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_control_error_status_mapping() {
        let timeout = ApiError::from(ControlError::Timeout {
            operation: "activate".to_string(),
            after: Duration::from_secs(5),
        });
        assert_eq!(timeout.status, Status::GatewayTimeout);

        let unreachable = ApiError::from(ControlError::Connection("gone".to_string()));
        assert_eq!(unreachable.status, Status::BadGateway);

        let unknown = ApiError::from(ControlError::PropertyNotFound("dataPath".to_string()));
        assert_eq!(unknown.status, Status::BadGateway);

        let missing = ApiError::from(ControlError::NotFound("none".to_string()));
        assert_eq!(missing.status, Status::NotFound);
    }

    #[test]
    fn test_data_file_error_mapping() {
        assert_eq!(
            ApiError::from(DataFileError::EmptyPath),
            ApiError::not_found("Data path is empty")
        );
        let decode = ApiError::from(DataFileError::Decode("x.csv".into()));
        assert_eq!(decode.status, Status::InternalServerError);
        assert_eq!(decode.message, "Error decoding data file");
    }
}

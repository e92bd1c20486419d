// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Static assets and fallback handlers
//!
//! The operator console (`index.html`, `style.css`, `favicon.ico`) is read
//! from the www directory on every request, so it can be edited while the
//! gateway runs.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use rocket::http::{ContentType, Header, Status};
use rocket::response::Responder;
use rocket::{catch, get, Request, Response, State};

use super::requests::ExactPath;
use super::responses::ApiError;
use crate::config::Config;

/// Raw file body with its content type
#[derive(Debug)]
pub struct StaticFileResponse(Vec<u8>, ContentType);

impl<'r> Responder<'r, 'static> for StaticFileResponse {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        Response::build()
            .header(self.1)
            .header(Header::new("Cache-Control", "no-cache"))
            .sized_body(self.0.len(), Cursor::new(self.0))
            .ok()
    }
}

async fn serve_static(
    www_dir: &Path,
    name: &str,
    content_type: ContentType,
) -> Result<StaticFileResponse, ApiError> {
    let path = www_dir.join(name);
    debug!("Serving static file {:?}", path);
    match tokio::fs::read(&path).await {
        Ok(contents) => Ok(StaticFileResponse(contents, content_type)),
        Err(e) => {
            warn!("Cannot read static file {:?}: {}", path, e);
            Err(ApiError::not_found(format!("File Not Found: /{}", name)))
        }
    }
}

#[get("/")]
pub async fn index(
    _exact: ExactPath,
    config: &State<Arc<Config>>,
) -> Result<StaticFileResponse, ApiError> {
    serve_static(
        &config.server.resolved_www_dir(),
        "index.html",
        ContentType::HTML,
    )
    .await
}

#[get("/index.html")]
pub async fn index_html(
    _exact: ExactPath,
    config: &State<Arc<Config>>,
) -> Result<StaticFileResponse, ApiError> {
    serve_static(
        &config.server.resolved_www_dir(),
        "index.html",
        ContentType::HTML,
    )
    .await
}

#[get("/favicon.ico")]
pub async fn favicon(
    _exact: ExactPath,
    config: &State<Arc<Config>>,
) -> Result<StaticFileResponse, ApiError> {
    serve_static(
        &config.server.resolved_www_dir(),
        "favicon.ico",
        ContentType::Icon,
    )
    .await
}

#[get("/style.css")]
pub async fn style(
    _exact: ExactPath,
    config: &State<Arc<Config>>,
) -> Result<StaticFileResponse, ApiError> {
    serve_static(
        &config.server.resolved_www_dir(),
        "style.css",
        ContentType::CSS,
    )
    .await
}

/// Unknown paths, whatever the method
#[catch(404)]
pub fn not_found(request: &Request<'_>) -> ApiError {
    debug!("No route for {} {}", request.method(), request.uri());
    ApiError::not_found(format!("File Not Found: {}", request.uri()))
}

/// Request rejected by Rocket before reaching a route (oversized or non UTF-8 body)
#[catch(default)]
pub fn default_catcher(status: Status, request: &Request<'_>) -> ApiError {
    warn!(
        "{} {} rejected with status {}",
        request.method(),
        request.uri(),
        status.code
    );
    ApiError::new(status, status.reason().unwrap_or("Request failed"))
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cross-Origin Resource Sharing (CORS) support
//!
//! Lets an operator console served from another origin (a laptop, a lab
//! dashboard) read the instrument state and send commands to the gateway.

use std::path::PathBuf;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{options, Request, Response};

/// CORS fairing adding permissive headers to every gateway response
///
/// ### Security Note
///
/// Any origin may call the gateway, including the commands that power the
/// detector or start an acquisition. Keep the listener on a trusted network,
/// or bind `server.address` to `127.0.0.1` behind a reverse proxy that
/// restricts origins.
pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    /// Runs on responses only
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    /// Adds the headers to every response, error pages included
    ///
    /// ### Parameters
    ///
    /// * `_request` - The request that generated this response (unused)
    /// * `response` - The response to modify
    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        // The gateway only routes GET and POST
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

/// Answers CORS preflight requests for any path with `200 OK`
#[options("/<_path..>")]
pub async fn options(_path: PathBuf) {}

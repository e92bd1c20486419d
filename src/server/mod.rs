// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP endpoint router
//!
//! Maps HTTP requests onto the control client:
//! - [`api`]: property reads, status aggregate, data file, health
//! - [`commands`]: power, acquisition and temperature commands
//! - [`handlers`]: static console assets and the 404 catcher
//! - [`requests`] / [`responses`]: body decoding and error-to-status mapping

pub mod api;
pub mod builder;
pub mod commands;
pub mod cors;
pub mod handlers;
pub mod requests;
pub mod responses;

pub use builder::{build_rocket, gateway_figment};
pub use responses::{ApiError, PlainText};

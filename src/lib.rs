// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HODR gateway library
//!
//! HTTP gateway exposing the `hodr.server.Control` D-Bus object of the HODR
//! spectrometer to plain HTTP clients.

pub mod config;
pub mod control;
pub mod daemon;
pub mod formatting;
pub mod server;

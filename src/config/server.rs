// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP listener configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Enable or disable the HTTP listener. Default is `true`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// The network address the listener binds to.
    ///
    /// Default is "0.0.0.0" so operator consoles on the lab network can reach
    /// the instrument.
    #[serde(default = "default_address")]
    pub address: String,

    /// The TCP port the listener binds to. Default is 8080.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The server name reported in HTTP headers and logs.
    #[serde(default = "default_name")]
    pub name: String,

    /// Directory holding `index.html`, `style.css` and `favicon.ico`.
    ///
    /// When unset, the `www` directory next to the running executable is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub www_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            address: default_address(),
            port: default_port(),
            name: default_name(),
            www_dir: None,
        }
    }
}

impl ServerConfig {
    /// Directory static assets are served from
    pub fn resolved_www_dir(&self) -> PathBuf {
        if let Some(dir) = &self.www_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|parent| parent.join("www")))
            .unwrap_or_else(|| PathBuf::from("www"))
    }
}

fn default_enabled() -> bool {
    true
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Generates the default server name string based on the current package version.
fn default_name() -> String {
    format!("HodrGateway/{}", env!("CARGO_PKG_VERSION"))
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the HODR gateway
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings for the gateway. The configuration is backed by a
//! YAML file and validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `server`: Settings for the HTTP listener and static assets
//! - `control`: Settings for reaching the `hodr.server.Control` object
//! - `data`: Settings for locating the spectral data file
//!
//! ## Usage
//!
//! ```no_run
//! use hodr_gateway::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8081),                  // HTTP port
//!     Some("0.0.0.0".to_string()), // HTTP address
//!     None,                        // www directory
//!     None,                        // data base directory
//!     false,                       // mock control backend
//! );
//!
//! println!("Server port: {}", config.server.port);
//! ```

pub mod control;
pub mod data;
pub mod server;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use control::{BusKind, ControlBackend, ControlConfig};
pub use data::DataConfig;
pub use server::ServerConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// JSON schema every configuration file is validated against.
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure for the gateway.
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// Settings for the connection to the instrument control object.
    #[serde(default)]
    pub control: ControlConfig,

    /// Settings for the spectral data file exposed on `/data`.
    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file that fails
    /// schema validation, deserialization or the additional rules produces a
    /// `<name>.sample.yaml` next to it and an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        Self::from_yaml_str(&contents).or_else(|err| {
            if let Err(sample_err) = Self::create_sample_config(path) {
                error!("Failed to create sample config: {}", sample_err);
            }
            Err(err.context(format!("Invalid configuration in {}", path.display())))
        })
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document deserializes to null, which means "all defaults"
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;
        let yaml_value = if yaml_value.is_null() {
            serde_yml::Value::Mapping(serde_yml::Mapping::new())
        } else {
            yaml_value
        };

        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = serde_json::from_value(json_value)
            .context("Failed to deserialize configuration")?;

        utils::validate_specific_rules(&config)?;
        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only explicitly provided values override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `port` - TCP port for the HTTP listener
    /// * `address` - Network address for the HTTP listener
    /// * `www_dir` - Directory holding `index.html`, `style.css` and `favicon.ico`
    /// * `data_dir` - Base directory the reported data path is resolved against
    /// * `mock` - Use the in-memory simulated instrument instead of D-Bus
    pub fn apply_args(
        &mut self,
        port: Option<u16>,
        address: Option<String>,
        www_dir: Option<PathBuf>,
        data_dir: Option<PathBuf>,
        mock: bool,
    ) {
        if let Some(port) = port {
            debug!("Overriding port from command line: {}", port);
            self.server.port = port;
        }

        if let Some(address) = address {
            debug!("Overriding address from command line: {}", address);
            self.server.address = address;
        }

        if let Some(www_dir) = www_dir {
            debug!("Overriding www directory from command line: {:?}", www_dir);
            self.server.www_dir = Some(www_dir);
        }

        if let Some(data_dir) = data_dir {
            debug!("Overriding data directory from command line: {:?}", data_dir);
            self.data.base_dir = data_dir;
        }

        if mock {
            debug!("Using the simulated control backend");
            self.control.backend = ControlBackend::Mock;
        }
    }
}

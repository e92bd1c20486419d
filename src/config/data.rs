// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Spectral data file configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for locating the data file reported by the control object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory relative data paths reported by the control daemon are
    /// resolved against.
    ///
    /// The control daemon reports paths relative to its own working
    /// directory, which by default sits one level above the gateway's.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("..")
}

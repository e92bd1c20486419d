// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Response formatting
//!
//! Turns control object values into the bodies served by the gateway:
//! - [`status`]: the `/status` aggregate and the power status
//! - [`data_file`]: the annotated data file served on `/data`
//! - [`PropertyText`]: plain-text rendering of single properties

pub mod data_file;
pub mod status;

pub use data_file::{annotate, load_data_file, resolve_data_path, DataFileError, HEADER_PREFIX};
pub use status::{PowerStatus, StatusReport};

/// Plain-text rendering of a property value, without trailing newline
pub trait PropertyText {
    fn to_property_text(&self) -> String;
}

impl PropertyText for f64 {
    /// Doubles always carry a fractional part (`21.5`, `-70.0`)
    fn to_property_text(&self) -> String {
        format!("{:?}", self)
    }
}

impl PropertyText for bool {
    fn to_property_text(&self) -> String {
        self.to_string()
    }
}

impl PropertyText for u32 {
    fn to_property_text(&self) -> String {
        self.to_string()
    }
}

impl PropertyText for i32 {
    fn to_property_text(&self) -> String {
        self.to_string()
    }
}

impl PropertyText for String {
    fn to_property_text(&self) -> String {
        self.clone()
    }
}

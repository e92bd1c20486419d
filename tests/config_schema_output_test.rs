// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use hodr_gateway::config::{self, CONFIG_SCHEMA};

#[test]
fn test_config_schema_output() -> Result<()> {
    // Output goes to stdout, only check that it succeeds
    config::output_config_schema()?;
    Ok(())
}

#[test]
fn test_config_schema_describes_every_section() -> Result<()> {
    let schema: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA)?;
    let properties = schema["properties"].as_object().unwrap();
    for section in ["server", "control", "data"] {
        assert!(properties.contains_key(section), "missing section {section}");
    }
    assert_eq!(
        schema["properties"]["control"]["properties"]["backend"]["enum"],
        serde_json::json!(["dbus", "mock"])
    );
    Ok(())
}

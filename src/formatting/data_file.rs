// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Annotated data file
//!
//! The acquisition daemon appends one comma-separated line per spectrum to a
//! data file: spectrum number, timestamp, integration time, temperature, then
//! one column per channel. The file has no header. `/data` serves it with a
//! synthesized header naming the first four columns and listing the index of
//! every populated channel column of the first line.

use std::path::{Component, Path, PathBuf};

use log::debug;
use thiserror::Error;

/// Fixed part of the synthesized header
pub const HEADER_PREFIX: &str = "number, timestamp, integration_time, temperature,";

/// Index of the first channel column
const FIRST_CHANNEL_COLUMN: usize = 4;

#[derive(Error, Debug)]
pub enum DataFileError {
    #[error("Data path is empty")]
    EmptyPath,

    #[error("Data path '{0}' leaves the data directory")]
    OutsideDataDir(String),

    #[error("Data file {0:?} does not exist")]
    Missing(PathBuf),

    #[error("Data file {0:?} is not valid UTF-8")]
    Decode(PathBuf),

    #[error("Failed to read data file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve the data path reported by the control object
///
/// Surrounding quotes are removed. Absolute paths are kept as they are,
/// relative ones are joined to `base_dir` and may not contain `..`.
pub fn resolve_data_path(base_dir: &Path, reported: &str) -> Result<PathBuf, DataFileError> {
    let cleaned = reported.trim_matches('\'').trim_matches('"');
    if cleaned.is_empty() {
        return Err(DataFileError::EmptyPath);
    }

    let path = Path::new(cleaned);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    if path
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(DataFileError::OutsideDataDir(cleaned.to_string()));
    }
    Ok(base_dir.join(path))
}

/// Build the header line for a data file, newline included
pub fn synthesize_header(content: &str) -> String {
    let first_line = content.split('\n').next().unwrap_or_default();
    let columns: Vec<String> = first_line
        .split(',')
        .enumerate()
        .skip(FIRST_CHANNEL_COLUMN)
        .filter(|(_, field)| !field.trim().is_empty())
        .map(|(index, _)| index.to_string())
        .collect();

    let mut header = HEADER_PREFIX.to_string();
    header.push_str(&columns.join(","));
    let mut header = header.trim_end_matches(',').to_string();
    header.push('\n');
    header
}

/// Prepend the synthesized header to the unchanged file content
pub fn annotate(content: &str) -> String {
    let mut annotated = synthesize_header(content);
    annotated.push_str(content);
    annotated
}

/// Read and annotate the data file at `path`
pub async fn load_data_file(path: &Path) -> Result<String, DataFileError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DataFileError::Missing(path.to_path_buf()))
        }
        Err(source) => {
            return Err(DataFileError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let content =
        String::from_utf8(bytes).map_err(|_| DataFileError::Decode(path.to_path_buf()))?;
    debug!("Read {} bytes from {:?}", content.len(), path);
    Ok(annotate(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_header_lists_populated_channel_columns() {
        assert_eq!(
            synthesize_header("a,b,c,d,e,f,,g\n"),
            "number, timestamp, integration_time, temperature,4,5,7\n"
        );
    }

    #[test]
    fn test_header_without_channels() {
        assert_eq!(
            synthesize_header("1,t,0.5,-70"),
            "number, timestamp, integration_time, temperature\n"
        );
        assert_eq!(
            synthesize_header(""),
            "number, timestamp, integration_time, temperature\n"
        );
    }

    #[test]
    fn test_header_ignores_whitespace_fields_and_carriage_return() {
        assert_eq!(
            synthesize_header("0,t,1,2, ,12,\r\n3,t,1,2,5,6,7\n"),
            "number, timestamp, integration_time, temperature,5\n"
        );
    }

    #[test]
    fn test_annotate_keeps_original_content() {
        let content = "0,2025-01-01 00:00:00,0.5,-70.0,10,20\n1,2025-01-01 00:00:01,0.5,-70.0,11,21\n";
        let annotated = annotate(content);
        let lines: Vec<&str> = annotated.lines().collect();
        assert_eq!(lines[0], "number, timestamp, integration_time, temperature,4,5");
        assert_eq!(lines[1], "0,2025-01-01 00:00:00,0.5,-70.0,10,20");
        assert!(annotated.ends_with(content));
    }

    #[test]
    fn test_resolve_data_path() {
        let base = Path::new("/srv/hodr");
        assert_eq!(
            resolve_data_path(base, "'data/run1.csv'").unwrap(),
            PathBuf::from("/srv/hodr/data/run1.csv")
        );
        assert_eq!(
            resolve_data_path(base, "\"/var/lib/hodr/run2.csv\"").unwrap(),
            PathBuf::from("/var/lib/hodr/run2.csv")
        );
        assert!(matches!(
            resolve_data_path(base, "''"),
            Err(DataFileError::EmptyPath)
        ));
        assert!(matches!(
            resolve_data_path(base, "../etc/passwd"),
            Err(DataFileError::OutsideDataDir(_))
        ));
    }

    #[tokio::test]
    async fn test_load_data_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0,t,0.5,-70.0,,3,4\n").unwrap();

        let annotated = load_data_file(file.path()).await.unwrap();
        assert_eq!(
            annotated,
            "number, timestamp, integration_time, temperature,5,6\n0,t,0.5,-70.0,,3,4\n"
        );
    }

    #[tokio::test]
    async fn test_load_data_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        assert!(matches!(
            load_data_file(&missing).await,
            Err(DataFileError::Missing(_))
        ));

        let binary = dir.path().join("binary.csv");
        std::fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            load_data_file(&binary).await,
            Err(DataFileError::Decode(_))
        ));
    }
}

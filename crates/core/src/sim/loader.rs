//! File loading.
//!
//! Reads the JSON documents a replay needs: the device specification, the
//! workload (commands plus metadata) and an optional configuration. Parsing
//! and validation errors carry the offending path.

use std::fs;
use std::path::Path;

use crate::common::error::{Result, SimError};
use crate::config::SimConfig;
use crate::spec::MemorySpec;
use crate::trace::Workload;

/// Parses and validates a specification document.
pub fn parse_spec(json: &str) -> Result<MemorySpec> {
    parse_spec_named(json, "specification")
}

/// Loads and validates a specification file.
pub fn load_spec(path: impl AsRef<Path>) -> Result<MemorySpec> {
    let path = path.as_ref();
    parse_spec_named(&read(path)?, &path.display().to_string())
}

/// Parses a workload document.
pub fn parse_workload(json: &str) -> Result<Workload> {
    parse(json, "workload")
}

/// Loads a workload file.
pub fn load_workload(path: impl AsRef<Path>) -> Result<Workload> {
    let path = path.as_ref();
    parse(&read(path)?, &path.display().to_string())
}

/// Loads a replay configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimConfig> {
    let path = path.as_ref();
    parse(&read(path)?, &path.display().to_string())
}

fn parse_spec_named(json: &str, what: &str) -> Result<MemorySpec> {
    let spec: MemorySpec = parse(json, what)?;
    spec.validate()?;
    Ok(spec)
}

fn parse<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|source| SimError::Parse {
        what: what.to_string(),
        source,
    })
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })
}

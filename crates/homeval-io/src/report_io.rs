use crate::error::{IoError, IoResult};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serialize a value as pretty JSON to `path`.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> IoResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|source| IoError::File {
        path: path.display().to_string(),
        source,
    })
}

/// Load a JSON document from `path`.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> IoResult<T> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| IoError::File {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

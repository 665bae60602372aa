//! Recognising which kind of save a JSON document is.

use serde_json::{Map, Value};

use crate::error::SaveError;
use crate::payload::{FORMAT_VERSION, SaveFile, WorldBlocks};

/// How a loaded document was interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    /// Carries a `formatVersion` tag this build understands.
    Tagged(u64),
    /// Full payload written before the version tag existed.
    Untagged,
    /// Bare world map at the top level.
    LegacyWorld,
}

/// `true` for an object whose keys all parse as `i32`.
fn integer_keyed(map: &Map<String, Value>) -> bool {
    map.keys().all(|key| key.parse::<i32>().is_ok())
}

/// Structural check for the legacy shape: three levels of integer-keyed
/// objects ending in block ids.
pub fn looks_like_world(value: &Value) -> bool {
    let Value::Object(xs) = value else {
        return false;
    };
    if xs.is_empty() || !integer_keyed(xs) {
        return false;
    }
    xs.values().all(|zs| {
        zs.as_object().is_some_and(|zs| {
            integer_keyed(zs)
                && zs.values().all(|ys| {
                    ys.as_object().is_some_and(|ys| {
                        integer_keyed(ys)
                            && ys
                                .values()
                                .all(|id| id.as_u64().is_some_and(|id| id <= u16::MAX as u64))
                    })
                })
        })
    })
}

/// Classifies a parsed document without deserializing it fully.
pub fn detect_format(value: &Value) -> Result<SaveFormat, SaveError> {
    let Value::Object(top) = value else {
        return Err(SaveError::UnrecognizedShape);
    };
    if let Some(tag) = top.get("formatVersion") {
        let version = tag.as_u64().ok_or(SaveError::UnrecognizedShape)?;
        if version == 0 || version > FORMAT_VERSION {
            return Err(SaveError::UnsupportedVersion(version));
        }
        return Ok(SaveFormat::Tagged(version));
    }
    if top.get("world").is_some_and(Value::is_object) {
        return Ok(SaveFormat::Untagged);
    }
    if looks_like_world(value) {
        return Ok(SaveFormat::LegacyWorld);
    }
    Err(SaveError::UnrecognizedShape)
}

/// Parses save text of any supported format into the current payload shape.
pub fn parse_save(text: &str) -> Result<(SaveFile, SaveFormat), SaveError> {
    let value: Value = serde_json::from_str(text)?;
    let format = detect_format(&value)?;
    let file = match format {
        SaveFormat::Tagged(_) | SaveFormat::Untagged => serde_json::from_str::<SaveFile>(text)?,
        SaveFormat::LegacyWorld => SaveFile {
            world: serde_json::from_str::<WorldBlocks>(text)?,
            ..Default::default()
        },
    };
    Ok((file, format))
}

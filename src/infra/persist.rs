//! Canonical serialization of the two catalog artifacts.
//!
//! Both artifacts are JSON objects keyed by the decimal string form of the
//! trace ID, ordered by key, two-space indentation. A missing or empty file
//! deserializes to an empty catalog so a first run against a fresh project
//! needs no setup. Writes go through a temp file in the target directory
//! followed by a rename.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::core::catalog::{TraceFormat, TraceId, TraceLocation};

/// Loads the format catalog (ID → TraceFormat), e.g. `til.json`.
pub fn load_formats(path: &Path) -> Result<HashMap<TraceId, TraceFormat>> {
    load_catalog(path)
}

/// Loads the location catalog (ID → TraceLocation), e.g. `li.json`.
pub fn load_locations(path: &Path) -> Result<HashMap<TraceId, TraceLocation>> {
    load_catalog(path)
}

/// Persists the format catalog.
pub fn save_formats(path: &Path, catalog: &HashMap<TraceId, TraceFormat>) -> Result<()> {
    save_catalog(path, catalog)
}

/// Persists the location catalog.
pub fn save_locations(path: &Path, catalog: &HashMap<TraceId, TraceLocation>) -> Result<()> {
    save_catalog(path, catalog)
}

fn load_catalog<T: DeserializeOwned>(path: &Path) -> Result<HashMap<TraceId, T>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let keyed: BTreeMap<String, T> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse catalog {}", path.display()))?;

    let mut catalog = HashMap::with_capacity(keyed.len());
    for (key, value) in keyed {
        let id: TraceId = key
            .parse()
            .with_context(|| format!("non-numeric ID key {key:?} in {}", path.display()))?;
        if id == 0 {
            bail!("ID key 0 is not allowed in {}", path.display());
        }
        catalog.insert(id, value);
    }
    Ok(catalog)
}

fn save_catalog<T: Serialize>(path: &Path, catalog: &HashMap<TraceId, T>) -> Result<()> {
    // BTreeMap over the decimal string keys gives the canonical key order.
    let keyed: BTreeMap<String, &T> = catalog
        .iter()
        .map(|(id, value)| (id.to_string(), value))
        .collect();

    let mut body = serde_json::to_string_pretty(&keyed)
        .with_context(|| format!("failed to serialize catalog {}", path.display()))?;
    body.push('\n');

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))
        .with_context(|| format!("failed to create temp file next to {}", path.display()))?;
    std::fs::write(tmp.path(), body)
        .with_context(|| format!("failed to write catalog {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace catalog {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_formats() -> HashMap<TraceId, TraceFormat> {
        let mut m = HashMap::new();
        m.insert(
            1000,
            TraceFormat {
                type_name: "TRICE8_1".to_string(),
                format_string: "msg:value=%d\\n".to_string(),
            },
        );
        m.insert(
            2,
            TraceFormat {
                type_name: "trice".to_string(),
                format_string: "boot\\n".to_string(),
            },
        );
        m
    }

    #[test]
    fn round_trips_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("til.json");
        let original = sample_formats();

        save_formats(&path, &original).unwrap();
        let loaded = load_formats(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn round_trips_locations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("li.json");
        let mut original = HashMap::new();
        original.insert(
            1000,
            TraceLocation {
                file: "file.c".to_string(),
                line: 2,
            },
        );

        save_locations(&path, &original).unwrap();
        assert_eq!(load_locations(&path).unwrap(), original);
    }

    #[test]
    fn missing_or_empty_file_is_an_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.json");
        assert!(load_formats(&absent).unwrap().is_empty());

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "  \n").unwrap();
        assert!(load_formats(&empty).unwrap().is_empty());
    }

    #[test]
    fn serialization_is_deterministic_and_key_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        let catalog = sample_formats();

        save_formats(&a, &catalog).unwrap();
        save_formats(&b, &catalog).unwrap();
        let text_a = std::fs::read_to_string(&a).unwrap();
        let text_b = std::fs::read_to_string(&b).unwrap();
        assert_eq!(text_a, text_b);

        // Two-space indentation, artifact field names, escapes kept textual.
        assert!(text_a.contains("  \"1000\": {"));
        assert!(text_a.contains("    \"Type\": \"TRICE8_1\""));
        assert!(text_a.contains(r#"    "Strg": "msg:value=%d\\n""#));
    }

    #[test]
    fn zero_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("til.json");
        std::fs::write(&path, r#"{"0": {"Type": "TRICE", "Strg": "x"}}"#).unwrap();
        assert!(load_formats(&path).is_err());
    }
}

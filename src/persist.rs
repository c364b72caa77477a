use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};

/// One team object in the dashboard document. Every metric key is written,
/// `null` when unknown. Keys this crate does not own ride along in `extra`
/// and are written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedEntry {
    #[serde(default, deserialize_with = "lenient_team")]
    pub team: String,
    #[serde(rename = "off_epa", default)]
    pub off_efficiency: Option<f64>,
    #[serde(rename = "def_epa", default)]
    pub def_efficiency: Option<f64>,
    #[serde(rename = "off_pass_epa", default)]
    pub off_pass_efficiency: Option<f64>,
    #[serde(rename = "off_rush_epa", default)]
    pub off_rush_efficiency: Option<f64>,
    #[serde(rename = "def_pass_epa", default)]
    pub def_pass_efficiency: Option<f64>,
    #[serde(rename = "def_rush_epa", default)]
    pub def_rush_efficiency: Option<f64>,
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub wins: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub losses: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersistedEntry {
    pub fn new(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            ..Self::default()
        }
    }
}

fn lenient_team<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

// pandas-era documents sometimes carry counts as 10.0 or "10".
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn count_from_value(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    if let Some(f) = value.as_f64() {
        return (f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX)).then_some(f as u32);
    }
    value.as_str()?.trim().parse::<u32>().ok()
}

/// `weekly_stats.json` -> `weekly_stats.json.bak`
pub fn default_backup_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "bak")
}

fn staging_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "tmp")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// `Ok(None)` when no document exists yet.
pub fn load_document(path: &Path) -> Result<Option<Vec<PersistedEntry>>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(PipelineError::io(
                format!("read {}", path.display()),
                err,
            ));
        }
    };
    parse_document(path, &raw).map(Some)
}

pub fn require_document(path: &Path) -> Result<Vec<PersistedEntry>> {
    load_document(path)?.ok_or_else(|| PipelineError::MissingOutputFile(path.to_path_buf()))
}

fn parse_document(path: &Path, raw: &str) -> Result<Vec<PersistedEntry>> {
    let malformed = |reason: String| PipelineError::MalformedDocument {
        path: path.to_path_buf(),
        reason,
    };
    let value: Value = serde_json::from_str(raw.trim()).map_err(|e| malformed(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(malformed("expected a JSON array of team objects".to_string()));
    };
    if let Some(idx) = items.iter().position(|item| !item.is_object()) {
        return Err(malformed(format!("element {idx} is not an object")));
    }
    items
        .into_iter()
        .map(|item| serde_json::from_value::<PersistedEntry>(item).map_err(|e| malformed(e.to_string())))
        .collect()
}

/// Copies the current document to `backup`, then swaps in the new content
/// through a staged sibling file so readers only ever see a whole document.
pub fn write_document(path: &Path, backup: &Path, entries: &[PersistedEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| PipelineError::io(format!("create {}", parent.display()), e))?;
    }
    if path.exists() {
        fs::copy(path, backup).map_err(|e| {
            PipelineError::io(
                format!("back up {} to {}", path.display(), backup.display()),
                e,
            )
        })?;
        tracing::info!(backup = %backup.display(), "backed up previous document");
    }

    let mut json = serde_json::to_string_pretty(entries)?;
    json.push('\n');
    let tmp = staging_path(path);
    if let Err(err) = write_synced(&tmp, json.as_bytes()) {
        let _ = fs::remove_file(&tmp);
        return Err(PipelineError::io(format!("write {}", tmp.display()), err));
    }
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(PipelineError::io(
            format!("swap {} into {}", tmp.display(), path.display()),
            err,
        ));
    }
    sync_parent_dir(path);
    Ok(())
}

// The staged bytes must be on disk before the rename can be.
fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

// Persists the rename itself. Directories cannot be opened for syncing on
// every platform, so a failure here is logged rather than fatal.
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Err(err) = File::open(parent).and_then(|dir| dir.sync_all()) {
        tracing::debug!(%err, dir = %parent.display(), "could not sync document directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_path_is_a_sibling() {
        assert_eq!(
            default_backup_path(Path::new("public/weekly_stats.json")),
            PathBuf::from("public/weekly_stats.json.bak")
        );
    }

    #[test]
    fn entries_keep_unknown_fields_and_coerce_counts() {
        let raw = r#"[{"team":"NE","off_epa":0.1,"wins":10.0,"losses":"5","logo":"ne.png"}]"#;
        let entries = parse_document(Path::new("x.json"), raw).unwrap();
        assert_eq!(entries[0].team, "NE");
        assert_eq!(entries[0].off_efficiency, Some(0.1));
        assert_eq!(entries[0].wins, Some(10));
        assert_eq!(entries[0].losses, Some(5));
        assert_eq!(entries[0].extra.get("logo"), Some(&Value::from("ne.png")));

        let out = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(out["logo"], Value::from("ne.png"));
        assert_eq!(out["wins"], Value::from(10));
        assert_eq!(out.get("tempo"), Some(&Value::Null));
    }

    #[test]
    fn null_metrics_are_written_as_null() {
        let raw = r#"[{"team":"NE","tempo":null,"wins":null}]"#;
        let entries = parse_document(Path::new("x.json"), raw).unwrap();
        let out = serde_json::to_value(&entries).unwrap();
        let keys = [
            "off_epa",
            "def_epa",
            "off_pass_epa",
            "off_rush_epa",
            "def_pass_epa",
            "def_rush_epa",
            "tempo",
            "wins",
            "losses",
        ];
        for key in keys {
            assert_eq!(out[0].get(key), Some(&Value::Null), "{key}");
        }
        assert_eq!(out[0]["team"], Value::from("NE"));
    }

    #[test]
    fn staged_write_replaces_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weekly_stats.json");
        let backup = default_backup_path(&path);

        write_document(&path, &backup, &[PersistedEntry::new("NE")]).unwrap();
        write_document(&path, &backup, &[PersistedEntry::new("NE"), PersistedEntry::new("BUF")])
            .unwrap();

        assert!(!staging_path(&path).exists());
        assert_eq!(load_document(&path).unwrap().unwrap().len(), 2);
        assert_eq!(load_document(&backup).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn failed_staging_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weekly_stats.json");
        let backup = default_backup_path(&path);
        write_document(&path, &backup, &[PersistedEntry::new("NE")]).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // A directory squatting on the staging path makes the staged write fail.
        fs::create_dir(staging_path(&path)).unwrap();
        let err = write_document(&path, &backup, &[PersistedEntry::new("BUF")]).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn non_array_documents_are_rejected() {
        for raw in [r#"{"team":"NE"}"#, r#"[1,2]"#, "not json"] {
            assert!(matches!(
                parse_document(Path::new("x.json"), raw),
                Err(PipelineError::MalformedDocument { .. })
            ));
        }
    }

    #[test]
    fn missing_team_reads_as_empty() {
        let entries = parse_document(Path::new("x.json"), r#"[{"wins":3},{"team":null}]"#).unwrap();
        assert_eq!(entries[0].team, "");
        assert_eq!(entries[1].team, "");
    }
}

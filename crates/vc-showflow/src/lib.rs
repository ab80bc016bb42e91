//! Showflow cleanup: strips transient timing metadata from a showflow
//! document, leaving clip names and the authoritative slot times.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Per-clip keys recomputed from slot time and therefore dropped.
pub const CLIP_TIMING_KEYS: [&str; 3] = ["duration", "in", "out"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub slots: usize,
    pub slot_durations_removed: usize,
    pub clips_simplified: usize,
    pub clip_fields_removed: usize,
}

/// Cleans `doc` in place. `None` when the document has no `slots` array,
/// in which case it is left untouched.
pub fn clean(doc: &mut Value) -> Option<CleanupReport> {
    let slots = doc.get_mut("slots")?.as_array_mut()?;
    let mut report = CleanupReport::default();

    for slot in slots.iter_mut().filter_map(Value::as_object_mut) {
        report.slots += 1;

        if slot.shift_remove("duration").is_some() {
            report.slot_durations_removed += 1;
        }

        if let Some(clips) = slot.get_mut("clips").and_then(Value::as_object_mut) {
            clean_clips(clips, &mut report);
        }
    }

    Some(report)
}

fn clean_clips(clips: &mut Map<String, Value>, report: &mut CleanupReport) {
    for clip in clips.values_mut() {
        // Already-simplified clips are plain strings.
        let Some(fields) = clip.as_object_mut() else {
            continue;
        };

        if let Some(name) = fields.get("name").cloned() {
            *clip = name;
            report.clips_simplified += 1;
            continue;
        }

        for key in CLIP_TIMING_KEYS {
            if fields.shift_remove(key).is_some() {
                report.clip_fields_removed += 1;
            }
        }
    }
}

/// Two-space indented JSON with non-ASCII text left unescaped.
pub fn to_pretty_json(doc: &Value) -> Result<String> {
    serde_json::to_string_pretty(doc).context("Failed to serialize showflow")
}

/// Cleans the file at `path` and writes it back. Missing `slots` leaves
/// the file as it was.
pub fn clean_file(path: &Path) -> Result<Option<CleanupReport>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut doc: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let Some(report) = clean(&mut doc) else {
        return Ok(None);
    };

    debug!("Cleanup of {}: {:?}", path.display(), report);

    fs::write(path, to_pretty_json(&doc)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(Some(report))
}

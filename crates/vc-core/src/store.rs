//! Lock-guarded holder of the live capture configuration.
//!
//! Reads hand out clones and updates swap in a fully built replacement, so
//! no caller ever observes a half-applied update or holds a reference into
//! the shared value.

use crate::config::{clamp_fps, clamp_quality, CaptureConfig, CaptureMode, Region};
use serde_json::{Map, Value};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

const REGION_KEYS: [&str; 4] = ["top", "left", "width", "height"];

pub const MSG_UPDATED: &str = "updated";
pub const MSG_NO_CHANGES: &str = "no changes";
pub const MSG_INVALID_PAYLOAD: &str = "Invalid payload";

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub accepted: bool,
    pub message: &'static str,
    pub config: CaptureConfig,
}

#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: Mutex<CaptureConfig>,
}

impl ConfigStore {
    pub fn new(initial: CaptureConfig) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    pub fn read(&self) -> CaptureConfig {
        self.lock().clone()
    }

    /// Applies a partial update. Fields that fail to parse are skipped
    /// individually; only a non-object payload is rejected outright.
    pub fn apply(&self, payload: &Value) -> UpdateOutcome {
        let Some(fields) = payload.as_object() else {
            debug!("Rejected non-object config payload");
            return UpdateOutcome {
                accepted: false,
                message: MSG_INVALID_PAYLOAD,
                config: self.read(),
            };
        };

        let mut current = self.lock();
        let mut next = current.clone();
        let updated = merge(&mut next, fields);

        if updated {
            *current = next;
            info!("Capture config updated: {:?}", *current);
        }

        UpdateOutcome {
            accepted: true,
            message: if updated { MSG_UPDATED } else { MSG_NO_CHANGES },
            config: current.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureConfig> {
        // A panic elsewhere cannot leave a half-written config behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Merges accepted fields into `config`, returning whether any was taken.
fn merge(config: &mut CaptureConfig, fields: &Map<String, Value>) -> bool {
    let mut updated = false;

    if let Some(mode) = fields.get("mode").and_then(Value::as_str).and_then(CaptureMode::parse) {
        config.mode = mode;
        updated = true;
    }

    if let Some(index) = fields.get("monitor_index").and_then(coerce_int) {
        config.monitor_index = index;
        updated = true;
    }

    if let Some(fps) = fields.get("fps").and_then(coerce_int) {
        config.fps = clamp_fps(fps);
        updated = true;
    }

    if let Some(quality) = fields.get("quality").and_then(coerce_int) {
        config.quality = clamp_quality(quality);
        updated = true;
    }

    // Older panels send the region keys at the top level.
    let region_fields = match fields.get("region") {
        Some(Value::Object(nested)) => Some(nested),
        _ if REGION_KEYS.iter().any(|key| fields.contains_key(*key)) => Some(fields),
        _ => None,
    };

    if let Some(region_fields) = region_fields {
        updated |= merge_region(&mut config.region, region_fields);
    }

    updated
}

fn merge_region(region: &mut Region, fields: &Map<String, Value>) -> bool {
    let mut updated = false;

    for key in REGION_KEYS {
        let Some(value) = fields.get(key).and_then(coerce_int) else {
            continue;
        };

        match key {
            "top" => region.top = value.max(0),
            "left" => region.left = value.max(0),
            "width" => region.width = value.max(1),
            _ => region.height = value.max(1),
        }
        updated = true;
    }

    updated
}

/// Lenient integer coercion: integers, finite floats (truncated), booleans
/// and base-10 integer strings. Everything else is `None`.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(*b as i64),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_QUALITY, MIN_FPS};
    use serde_json::json;

    #[test]
    fn test_fps_only_update() {
        let store = ConfigStore::default();
        let before = store.read();

        let outcome = store.apply(&json!({"fps": 15}));

        assert!(outcome.accepted);
        assert_eq!(outcome.message, "updated");
        assert_eq!(outcome.config, CaptureConfig { fps: 15, ..before });
        assert_eq!(store.read().fps, 15);
    }

    #[test]
    fn test_empty_update_is_no_changes() {
        let store = ConfigStore::default();

        let outcome = store.apply(&json!({}));

        assert!(outcome.accepted);
        assert_eq!(outcome.message, "no changes");
        assert_eq!(outcome.config, CaptureConfig::default());
    }

    #[test]
    fn test_unparsable_field_is_skipped() {
        let store = ConfigStore::default();

        let outcome = store.apply(&json!({"fps": "banana"}));

        assert!(outcome.accepted);
        assert_eq!(outcome.message, "no changes");
        assert_eq!(store.read().fps, 30);
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let store = ConfigStore::default();

        for payload in [json!("fps"), json!(42), json!([1, 2]), json!(null)] {
            let outcome = store.apply(&payload);
            assert!(!outcome.accepted);
            assert_eq!(outcome.message, "Invalid payload");
            assert_eq!(outcome.config, CaptureConfig::default());
        }
    }

    #[test]
    fn test_values_are_clamped_on_write() {
        let store = ConfigStore::default();

        store.apply(&json!({"quality": 200, "fps": 0}));

        let config = store.read();
        assert_eq!(config.quality, MAX_QUALITY);
        assert_eq!(config.fps, MIN_FPS);
    }

    #[test]
    fn test_mode_is_case_insensitive() {
        let store = ConfigStore::default();

        assert_eq!(store.apply(&json!({"mode": "MONITOR"})).config.mode, CaptureMode::Monitor);
        assert_eq!(store.apply(&json!({"mode": "window"})).message, "no changes");
        assert_eq!(store.apply(&json!({"mode": 1})).message, "no changes");
        assert_eq!(store.read().mode, CaptureMode::Monitor);
    }

    #[test]
    fn test_monitor_index_not_range_checked() {
        let store = ConfigStore::default();

        store.apply(&json!({"monitor_index": "7"}));

        assert_eq!(store.read().monitor_index, 7);
    }

    #[test]
    fn test_legacy_region_matches_nested() {
        let legacy = ConfigStore::default();
        let nested = ConfigStore::default();

        let a = legacy.apply(&json!({"top": 10, "left": 20, "width": 100, "height": 100}));
        let b = nested.apply(&json!({"region": {"top": 10, "left": 20, "width": 100, "height": 100}}));

        assert_eq!(a, b);
        assert_eq!(a.config.region, Region { top: 10, left: 20, width: 100, height: 100 });
    }

    #[test]
    fn test_partial_region_merges() {
        let store = ConfigStore::default();

        store.apply(&json!({"region": {"left": 50, "height": -3, "top": null}}));

        let region = store.read().region;
        assert_eq!(region, Region { top: 0, left: 50, width: 1280, height: 1 });
    }

    #[test]
    fn test_read_returns_independent_copy() {
        let store = ConfigStore::default();

        let mut copy = store.read();
        copy.fps = 1;

        assert_eq!(store.read().fps, 30);
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(coerce_int(&json!(5)), Some(5));
        assert_eq!(coerce_int(&json!(7.9)), Some(7));
        assert_eq!(coerce_int(&json!(" -12 ")), Some(-12));
        assert_eq!(coerce_int(&json!(true)), Some(1));
        assert_eq!(coerce_int(&json!("7.5")), None);
        assert_eq!(coerce_int(&json!(null)), None);
        assert_eq!(coerce_int(&json!({"a": 1})), None);
    }
}

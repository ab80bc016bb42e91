use crate::config::{CaptureConfig, CaptureMode};
use vc_capture::{BoundingBox, MonitorInfo};

/// Resolves the absolute capture rectangle for `config`.
///
/// The result always lies inside the selected monitor, whatever stale or
/// out-of-range values the config carries. `None` when there are no
/// monitors.
pub fn resolve(config: &CaptureConfig, monitors: &[MonitorInfo]) -> Option<BoundingBox> {
    if monitors.is_empty() {
        return None;
    }

    let index = config.monitor_index.clamp(0, monitors.len() as i64 - 1) as usize;
    let base = &monitors[index];

    if config.mode == CaptureMode::Monitor {
        return Some(base.rect());
    }

    let mon_width = base.width as i64;
    let mon_height = base.height as i64;
    let region = &config.region;

    let top = region.top.clamp(0, (mon_height - 1).max(0));
    let left = region.left.clamp(0, (mon_width - 1).max(0));

    let max_width = (mon_width - left).max(1);
    let max_height = (mon_height - top).max(1);
    let width = region.width.clamp(1, max_width);
    let height = region.height.clamp(1, max_height);

    Some(BoundingBox {
        top: base.top + top as i32,
        left: base.left + left as i32,
        width: width as u32,
        height: height as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Region;
    use vc_capture::index_monitors;

    fn dual_monitors() -> Vec<MonitorInfo> {
        index_monitors(&[
            BoundingBox::new(0, 0, 1920, 1080),
            BoundingBox::new(1920, -200, 1280, 1024),
        ])
    }

    fn config(mode: CaptureMode, monitor_index: i64, region: Region) -> CaptureConfig {
        CaptureConfig {
            mode,
            monitor_index,
            region,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_monitor_list() {
        assert_eq!(resolve(&CaptureConfig::default(), &[]), None);
    }

    #[test]
    fn test_monitor_mode_ignores_region() {
        let monitors = dual_monitors();
        let cfg = config(
            CaptureMode::Monitor,
            2,
            Region { top: 50, left: 50, width: 10, height: 10 },
        );

        assert_eq!(resolve(&cfg, &monitors), Some(monitors[2].rect()));
    }

    #[test]
    fn test_region_offset_by_monitor_origin() {
        let monitors = dual_monitors();
        let cfg = config(
            CaptureMode::Region,
            2,
            Region { top: 10, left: 20, width: 100, height: 50 },
        );

        assert_eq!(resolve(&cfg, &monitors), Some(BoundingBox::new(1940, -190, 100, 50)));
    }

    #[test]
    fn test_region_clamped_to_monitor() {
        let monitors = dual_monitors();
        let cfg = config(
            CaptureMode::Region,
            1,
            Region { top: 5000, left: 1900, width: 500, height: 500 },
        );

        let bbox = resolve(&cfg, &monitors).unwrap();
        assert_eq!(bbox, BoundingBox::new(1900, 1079, 20, 1));
    }

    #[test]
    fn test_monitor_index_clamped() {
        let monitors = dual_monitors();

        let high = config(CaptureMode::Monitor, 99, Region::default());
        let low = config(CaptureMode::Monitor, -3, Region::default());

        assert_eq!(resolve(&high, &monitors), Some(monitors[2].rect()));
        assert_eq!(resolve(&low, &monitors), Some(monitors[0].rect()));
    }

    #[test]
    fn test_box_always_inside_selected_monitor() {
        let monitors = dual_monitors();
        let values = [i64::MIN, -1, 0, 1, 719, 1080, 1919, 5000, i64::MAX];

        for index in -1..4 {
            for &a in &values {
                for &b in &values {
                    let cfg = config(
                        CaptureMode::Region,
                        index,
                        Region { top: a, left: b, width: b, height: a },
                    );
                    let selected = monitors[index.clamp(0, 2) as usize].rect();
                    let bbox = resolve(&cfg, &monitors).unwrap();

                    assert!(selected.contains(&bbox), "{:?} escapes {:?}", bbox, selected);
                    assert!(bbox.width >= 1 && bbox.height >= 1);
                }
            }
        }
    }
}

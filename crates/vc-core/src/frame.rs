use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use vc_capture::BoundingBox;

/// Most recent fully encoded frame and the box it was captured from.
#[derive(Debug, Clone)]
pub struct LatestFrame {
    pub jpeg: Bytes,
    pub bbox: BoundingBox,
    pub sequence: u64,
    pub captured_at: Instant,
}

impl LatestFrame {
    pub fn size(&self) -> usize {
        self.jpeg.len()
    }
}

/// Single-producer, multi-consumer latest-value slot.
///
/// Publishing replaces the value and wakes every subscriber; subscribers
/// that fall behind only ever see the newest frame.
#[derive(Debug, Clone)]
pub struct FrameSlot {
    tx: Arc<watch::Sender<Option<Arc<LatestFrame>>>>,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSlot {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, frame: LatestFrame) {
        self.tx.send_replace(Some(Arc::new(frame)));
    }

    pub fn latest(&self) -> Option<Arc<LatestFrame>> {
        self.tx.borrow().clone()
    }

    /// Subscribers wait for the next publish, not the current value.
    pub fn subscribe(&self) -> FrameSubscriber {
        FrameSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug)]
pub struct FrameSubscriber {
    rx: watch::Receiver<Option<Arc<LatestFrame>>>,
}

impl FrameSubscriber {
    /// Waits for the next published frame. `None` once the slot is dropped.
    pub async fn next(&mut self) -> Option<Arc<LatestFrame>> {
        loop {
            self.rx.changed().await.ok()?;
            let frame = self.rx.borrow_and_update().clone();
            if frame.is_some() {
                return frame;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frame(sequence: u64) -> LatestFrame {
        LatestFrame {
            jpeg: Bytes::from(vec![0xFF, 0xD8, sequence as u8]),
            bbox: BoundingBox::new(0, 0, 4, 4),
            sequence,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_empty_slot() {
        let slot = FrameSlot::new();
        assert!(slot.latest().is_none());
    }

    #[test]
    fn test_latest_is_newest() {
        let slot = FrameSlot::new();
        slot.publish(frame(1));
        slot.publish(frame(2));

        assert_eq!(slot.latest().unwrap().sequence, 2);
    }

    #[tokio::test]
    async fn test_subscriber_waits_for_next_publish() {
        let slot = FrameSlot::new();
        slot.publish(frame(1));

        let mut sub = slot.subscribe();
        let pending = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(pending.is_err());

        slot.publish(frame(2));
        let next = tokio::time::timeout(Duration::from_secs(1), sub.next()).await.unwrap();
        assert_eq!(next.unwrap().sequence, 2);
    }

    #[tokio::test]
    async fn test_slow_subscriber_skips_to_latest() {
        let slot = FrameSlot::new();
        let mut sub = slot.subscribe();

        for seq in 1..=5 {
            slot.publish(frame(seq));
        }

        assert_eq!(sub.next().await.unwrap().sequence, 5);
    }

    #[tokio::test]
    async fn test_subscriber_ends_when_slot_dropped() {
        let slot = FrameSlot::new();
        let mut sub = slot.subscribe();
        drop(slot);

        assert!(sub.next().await.is_none());
    }
}

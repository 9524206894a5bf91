// ============================================================================
// HISTORY STORE — bounded undo/redo stacks of compressed frame snapshots
// ============================================================================
//
// Snapshots are JPEG-compressed renders: this is a history log, not an
// archival copy, so size wins over fidelity. Each snapshot owns its buffer
// and is released exactly once when evicted, superseded or cleared.
//
// Invariants:
//   * the undo stack is never empty while an image is loaded; entry 0 is the
//     oldest surviving state (the pristine upload until capacity eviction),
//   * `undo.len() <= capacity`; exceeding it evicts the oldest entry,
//   * any recorded commit clears the redo stack (linear history),
//   * undo is a no-op with a single entry, redo with an empty redo stack.

use std::collections::VecDeque;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use log::{debug, warn};

use crate::error::EngineError;

/// Default undo depth.
pub const DEFAULT_CAPACITY: usize = 20;
/// Default JPEG quality for history snapshots (the 0.8 of the canvas codec).
pub const DEFAULT_SNAPSHOT_QUALITY: u8 = 80;

#[derive(Clone, Copy, Debug)]
pub struct HistoryConfig {
    /// Maximum undo depth; the oldest entry is evicted beyond this.
    pub capacity: usize,
    /// JPEG quality (1–100) used to compress snapshots.
    pub quality: u8,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            quality: DEFAULT_SNAPSHOT_QUALITY,
        }
    }
}

/// An immutable, compressed encoding of one fully-rendered frame.
#[derive(Clone)]
pub struct Snapshot {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl Snapshot {
    /// Compress a rendered frame. JPEG carries no alpha; history snapshots
    /// are flattened renders, so the channel is reconstructed as opaque on
    /// decode.
    pub fn capture(frame: &RgbaImage, quality: u8) -> Result<Snapshot, EngineError> {
        let (width, height) = frame.dimensions();
        let rgb = DynamicImage::ImageRgba8(frame.clone()).to_rgb8();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality)
            .encode_image(&rgb)
            .map_err(|e| EngineError::Encode(e.to_string()))?;
        Ok(Snapshot { bytes, width, height })
    }

    /// Decode back into a bitmap.
    pub fn decode(&self) -> Result<RgbaImage, EngineError> {
        let img = image::load_from_memory(&self.bytes)
            .map_err(|e| EngineError::Decode(e.to_string()))?
            .to_rgba8();
        if img.dimensions() != (self.width, self.height) {
            return Err(EngineError::Decode(format!(
                "snapshot decoded to {}x{}, expected {}x{}",
                img.width(),
                img.height(),
                self.width,
                self.height
            )));
        }
        Ok(img)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn memory_size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The frame differed from the newest entry and was pushed.
    Recorded,
    /// The frame was indistinguishable from the newest entry and dropped,
    /// so repeated idle commits never grow history.
    Unchanged,
}

pub struct HistoryStore {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    config: HistoryConfig,
    /// Running compressed-byte total across both stacks.
    total_memory: usize,
    /// The uncompressed pixels the newest undo entry stands for: the frame
    /// that was committed, or the lossy decode an undo/redo handed back.
    /// Comparing incoming commits against compressed bytes would not work —
    /// re-encoding a decoded frame produces different bytes for the same
    /// displayed pixels.
    newest_frame: Option<RgbaImage>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryStore {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            config,
            total_memory: 0,
            newest_frame: None,
        }
    }

    /// Capture the current rendered frame into history. Identical-content
    /// commits are dropped, which also makes racing idle commits idempotent.
    /// Content identity is pixel equality against the frame the newest entry
    /// stands for, so re-committing the exact frame an undo restored is a
    /// no-op and leaves the redo branch intact.
    pub fn commit(&mut self, frame: &RgbaImage) -> Result<CommitOutcome, EngineError> {
        if self.newest_frame.as_ref() == Some(frame) {
            return Ok(CommitOutcome::Unchanged);
        }

        let snapshot = Snapshot::capture(frame, self.config.quality)?;
        self.total_memory += snapshot.memory_size();
        self.undo.push_back(snapshot);
        self.newest_frame = Some(frame.clone());

        while self.undo.len() > self.config.capacity.max(1) {
            if let Some(evicted) = self.undo.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(evicted.memory_size());
                debug!("history: evicted oldest snapshot ({} bytes)", evicted.memory_size());
            }
        }

        for dropped in self.redo.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(dropped.memory_size());
        }

        Ok(CommitOutcome::Recorded)
    }

    /// Step back one state. Returns `Ok(None)` when there is nothing to undo
    /// (a single entry is the pristine load and cannot be undone past).
    ///
    /// Decode-before-mutate: the predecessor is decoded first, so a decode
    /// failure leaves both stacks untouched and the caller's displayed state
    /// valid.
    pub fn undo(&mut self) -> Result<Option<RgbaImage>, EngineError> {
        if self.undo.len() <= 1 {
            return Ok(None);
        }
        let target = &self.undo[self.undo.len() - 2];
        let bitmap = decode_with_retry(target)?;
        if let Some(current) = self.undo.pop_back() {
            self.redo.push(current);
        }
        self.newest_frame = Some(bitmap.clone());
        Ok(Some(bitmap))
    }

    /// Step forward one undone state. `Ok(None)` when the redo stack is empty.
    pub fn redo(&mut self) -> Result<Option<RgbaImage>, EngineError> {
        let Some(target) = self.redo.last() else {
            return Ok(None);
        };
        let bitmap = decode_with_retry(target)?;
        if let Some(snapshot) = self.redo.pop() {
            self.undo.push_back(snapshot);
        }
        self.newest_frame = Some(bitmap.clone());
        Ok(Some(bitmap))
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.total_memory = 0;
        self.newest_frame = None;
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty() && self.redo.is_empty()
    }

    /// Compressed bytes held across both stacks, O(1) via the running total.
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    /// The oldest surviving snapshot (the pristine upload until eviction).
    pub fn oldest(&self) -> Option<&Snapshot> {
        self.undo.front()
    }

    /// The snapshot of the current state.
    pub fn newest(&self) -> Option<&Snapshot> {
        self.undo.back()
    }
}

/// JPEG decode is deterministic, but decode is specified as retryable: try
/// once more before surfacing the failure.
fn decode_with_retry(snapshot: &Snapshot) -> Result<RgbaImage, EngineError> {
    match snapshot.decode() {
        Ok(bitmap) => Ok(bitmap),
        Err(first) => {
            warn!("history: snapshot decode failed ({first}), retrying once");
            snapshot.decode()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use proptest::prelude::*;

    fn solid(value: u8) -> RgbaImage {
        RgbaImage::from_pixel(16, 12, Rgba([value, value, value, 255]))
    }

    fn store(capacity: usize) -> HistoryStore {
        HistoryStore::new(HistoryConfig { capacity, quality: 80 })
    }

    #[test]
    fn commits_grow_until_capacity() {
        let mut h = store(20);
        for i in 0..5u8 {
            assert_eq!(h.commit(&solid(i * 40)).unwrap(), CommitOutcome::Recorded);
            assert_eq!(h.undo_len(), i as usize + 1);
        }
    }

    #[test]
    fn identical_commit_is_dropped() {
        let mut h = store(20);
        assert_eq!(h.commit(&solid(10)).unwrap(), CommitOutcome::Recorded);
        assert_eq!(h.commit(&solid(10)).unwrap(), CommitOutcome::Unchanged);
        assert_eq!(h.undo_len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest_only() {
        let mut h = store(3);
        let first = solid(0);
        for i in 0..5u8 {
            h.commit(&solid(i * 50)).unwrap();
        }
        assert_eq!(h.undo_len(), 3);
        // Oldest surviving entry is commit #2, not #0.
        let oldest = h.oldest().unwrap().decode().unwrap();
        assert_ne!(oldest.get_pixel(0, 0), first.get_pixel(0, 0));
        let px = oldest.get_pixel(0, 0)[0] as i16;
        assert!((px - 100).abs() <= 4, "expected ~100, got {px}");
    }

    #[test]
    fn undo_with_single_entry_is_a_noop() {
        let mut h = store(20);
        h.commit(&solid(128)).unwrap();
        assert!(h.undo().unwrap().is_none());
        assert_eq!(h.undo_len(), 1);
        assert_eq!(h.redo_len(), 0);
    }

    #[test]
    fn undo_then_redo_restores_previous_pixels() {
        let mut h = store(20);
        h.commit(&solid(60)).unwrap();
        h.commit(&solid(180)).unwrap();

        let restored = h.undo().unwrap().expect("one undo available");
        assert!((restored.get_pixel(0, 0)[0] as i16 - 60).abs() <= 4);
        assert_eq!(h.undo_len(), 1);
        assert_eq!(h.redo_len(), 1);

        let forward = h.redo().unwrap().expect("one redo available");
        assert!((forward.get_pixel(0, 0)[0] as i16 - 180).abs() <= 4);
        assert_eq!(h.undo_len(), 2);
        assert_eq!(h.redo_len(), 0);
    }

    #[test]
    fn recorded_commit_clears_redo() {
        let mut h = store(20);
        h.commit(&solid(20)).unwrap();
        h.commit(&solid(120)).unwrap();
        h.undo().unwrap();
        assert!(h.can_redo());

        h.commit(&solid(220)).unwrap();
        assert!(!h.can_redo());
        assert!(h.redo().unwrap().is_none());
    }

    #[test]
    fn idle_commit_of_a_restored_frame_keeps_redo() {
        let mut h = store(20);
        h.commit(&solid(20)).unwrap();
        h.commit(&solid(120)).unwrap();
        let restored = h.undo().unwrap().expect("one undo available");
        assert!(h.can_redo());

        // An idle settle re-commits exactly what undo displayed; the lossy
        // re-encode differs byte-wise but the pixels are unchanged, so this
        // must not grow history or drop the redo branch.
        assert_eq!(h.commit(&restored).unwrap(), CommitOutcome::Unchanged);
        assert_eq!(h.undo_len(), 1);
        assert!(h.can_redo());
    }

    #[test]
    fn clear_releases_everything() {
        let mut h = store(20);
        h.commit(&solid(10)).unwrap();
        h.commit(&solid(200)).unwrap();
        h.undo().unwrap();
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.memory_usage(), 0);
    }

    #[test]
    fn memory_usage_tracks_stacks() {
        let mut h = store(20);
        h.commit(&solid(10)).unwrap();
        let one = h.memory_usage();
        assert!(one > 0);
        h.commit(&solid(200)).unwrap();
        assert!(h.memory_usage() > one);
        h.undo().unwrap();
        // Entry moved to redo, totals unchanged.
        assert!(h.memory_usage() > one);
    }

    fn corrupt_snapshot() -> Snapshot {
        Snapshot { bytes: vec![0, 1, 2, 3], width: 16, height: 12 }
    }

    #[test]
    fn failed_undo_decode_leaves_both_stacks_untouched() {
        let mut h = store(20);
        h.commit(&solid(40)).unwrap();
        h.commit(&solid(200)).unwrap();
        h.undo[0] = corrupt_snapshot();

        let err = h.undo().unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
        assert_eq!(h.undo_len(), 2);
        assert_eq!(h.redo_len(), 0);
    }

    #[test]
    fn failed_redo_decode_leaves_both_stacks_untouched() {
        let mut h = store(20);
        h.commit(&solid(40)).unwrap();
        h.commit(&solid(200)).unwrap();
        h.undo().unwrap();
        h.redo[0] = corrupt_snapshot();

        let err = h.redo().unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
        assert_eq!(h.undo_len(), 1);
        assert_eq!(h.redo_len(), 1);
    }

    #[test]
    fn snapshot_round_trip_keeps_dimensions() {
        let frame = RgbaImage::from_fn(31, 17, |x, y| {
            Rgba([(x * 8) as u8, (y * 15) as u8, 99, 255])
        });
        let snap = Snapshot::capture(&frame, 80).unwrap();
        assert_eq!(snap.dimensions(), (31, 17));
        assert_eq!(snap.decode().unwrap().dimensions(), (31, 17));
    }

    proptest! {
        /// For any sequence of distinct commits and interleaved undo/redo,
        /// the undo stack stays within [1, capacity] once seeded.
        #[test]
        fn stacks_stay_bounded(ops in proptest::collection::vec(0u8..3, 1..60)) {
            let mut h = store(5);
            h.commit(&solid(255)).unwrap();
            let mut value = 0u8;
            for op in ops {
                match op {
                    0 => {
                        value = value.wrapping_add(37);
                        h.commit(&solid(value)).unwrap();
                    }
                    1 => { h.undo().unwrap(); }
                    _ => { h.redo().unwrap(); }
                }
                prop_assert!(h.undo_len() >= 1);
                prop_assert!(h.undo_len() <= 5);
                prop_assert!(h.redo_len() <= 5);
            }
        }
    }
}

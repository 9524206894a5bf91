// ============================================================================
// EDIT SESSION — owns the bitmap, transform state, history and state machine
// ============================================================================
//
// States: Empty → Loaded ⇄ CropPending, Loaded → AwaitingRemote → Loaded.
// The session is an explicit owned object with lifecycle create → use →
// dispose; nothing lives in ambient/global state.
//
// Continuous adjustments (sliders) re-render on every change for live
// preview, but history only grows on a settle event — pointer release or an
// explicit apply — so drag input cannot flood the undo stack. Discrete
// operations (rotate, flip, filter select, crop, remote result) commit
// immediately.
//
// A remote round-trip never holds a borrow across the await: `begin_remote`
// captures a ticket (generation + lossless frame bytes), the caller drives
// the HTTP exchange, and `apply_remote_result` / `fail_remote` close the
// state machine. Completions whose generation no longer matches (the session
// was cancelled or reloaded meanwhile) are detected as stale and discarded.

use std::time::{Duration, Instant};

use image::RgbaImage;
use log::{debug, info};
use uuid::Uuid;

use crate::error::EngineError;
use crate::filters::FilterKind;
use crate::history::{CommitOutcome, HistoryConfig, HistoryStore};
use crate::io;
use crate::render;
use crate::transform::TransformState;

/// Default quiet period before a continuous adjustment settles into history.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(400);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No image loaded.
    Empty,
    /// Image present and editable.
    Loaded,
    /// Crop overlay active; transform edits are suspended.
    CropPending,
    /// A remote enhancement request is in flight.
    AwaitingRemote,
}

#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    pub history: HistoryConfig,
    /// Debounce window for continuous-adjustment commits.
    pub settle_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// An axis-aligned crop rectangle in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Clamp to a frame of the given size. `None` when the intersection is
    /// empty.
    pub fn clamped_to(&self, frame_width: u32, frame_height: u32) -> Option<CropRegion> {
        if self.x >= frame_width || self.y >= frame_height {
            return None;
        }
        let width = self.width.min(frame_width - self.x);
        let height = self.height.min(frame_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(CropRegion { x: self.x, y: self.y, width, height })
    }
}

/// Coalesces rapid slider input: each change pushes the deadline out, and
/// the commit fires once the quiet period elapses. This is a rate-limiting
/// policy, not a correctness gate — an explicit `settle()` always commits.
#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    /// Register a change; restarts the quiet period.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// A change is waiting to settle.
    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// The quiet period has elapsed since the last change.
    pub fn due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    pub fn reset(&mut self) {
        self.deadline = None;
    }
}

/// Capability to complete exactly one remote round-trip. Created by
/// `begin_remote`, consumed by `apply_remote_result` or `fail_remote`.
#[derive(Debug)]
pub struct RemoteTicket {
    generation: u64,
    frame_png: Vec<u8>,
}

impl RemoteTicket {
    /// The lossless payload to upload.
    pub fn frame_png(&self) -> &[u8] {
        &self.frame_png
    }

    pub fn into_frame_png(self) -> Vec<u8> {
        self.frame_png
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct EditSession {
    id: Uuid,
    state: SessionState,
    /// Bumped on every load and cancel; stale async completions compare
    /// against it and are discarded.
    generation: u64,
    bitmap: Option<RgbaImage>,
    frame: Option<RgbaImage>,
    transform: TransformState,
    history: HistoryStore,
    debouncer: Debouncer,
    config: SessionConfig,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl EditSession {
    pub fn new(config: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        debug!("session {id}: created");
        Self {
            id,
            state: SessionState::Empty,
            generation: 0,
            bitmap: None,
            frame: None,
            transform: TransformState::default(),
            history: HistoryStore::new(config.history),
            debouncer: Debouncer::new(config.settle_delay),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The source bitmap the transform pipeline reads from.
    pub fn bitmap(&self) -> Option<&RgbaImage> {
        self.bitmap.as_ref()
    }

    /// The current rendered frame, available for display or export whenever
    /// an image is loaded.
    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Load a decoded bitmap (upload, restore — provenance is the caller's
    /// business). Resets the transform, re-renders, and seeds history with
    /// the pristine frame.
    pub fn load(&mut self, bitmap: RgbaImage) -> Result<(), EngineError> {
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(EngineError::InvalidInput(
                "cannot load an image with zero dimensions".into(),
            ));
        }
        self.generation += 1;
        info!(
            "session {}: loaded {}x{} image (generation {})",
            self.id,
            bitmap.width(),
            bitmap.height(),
            self.generation
        );
        self.transform = TransformState::default();
        self.bitmap = Some(bitmap);
        self.history.clear();
        self.debouncer.reset();
        self.state = SessionState::Loaded;
        self.render_current();
        if let Some(frame) = self.frame.as_ref() {
            self.history.commit(frame)?;
        }
        Ok(())
    }

    /// Discard everything and return to `Empty`. Valid from any state; an
    /// in-flight remote completion becomes stale via the generation bump.
    pub fn cancel(&mut self) {
        info!("session {}: cancelled", self.id);
        self.generation += 1;
        self.state = SessionState::Empty;
        self.bitmap = None;
        self.frame = None;
        self.transform = TransformState::default();
        self.history.clear();
        self.debouncer.reset();
    }

    // ------------------------------------------------------------------
    // Continuous adjustments (live preview, commit on settle)
    // ------------------------------------------------------------------

    pub fn set_brightness(&mut self, value: f32) -> Result<(), EngineError> {
        self.adjust(|t| t.set_brightness(value))
    }

    pub fn set_contrast(&mut self, value: f32) -> Result<(), EngineError> {
        self.adjust(|t| t.set_contrast(value))
    }

    pub fn set_saturation(&mut self, value: f32) -> Result<(), EngineError> {
        self.adjust(|t| t.set_saturation(value))
    }

    pub fn set_tint(&mut self, degrees: f32) -> Result<(), EngineError> {
        self.adjust(|t| t.set_tint(degrees))
    }

    pub fn set_temperature(&mut self, value: f32) -> Result<(), EngineError> {
        self.adjust(|t| t.set_temperature(value))
    }

    pub fn set_clarity(&mut self, value: f32) -> Result<(), EngineError> {
        self.adjust(|t| t.set_clarity(value))
    }

    /// Back to the pristine parameters (the original's "reset" control).
    pub fn reset_adjustments(&mut self) -> Result<(), EngineError> {
        self.adjust(|t| {
            *t = TransformState::default();
            Ok(())
        })
    }

    /// Replace the whole parameter set at once, e.g. when restoring a saved
    /// sidecar. Every field passes the same validation as its setter; the
    /// result commits on the next settle event.
    pub fn apply_transform(&mut self, params: TransformState) -> Result<(), EngineError> {
        self.adjust(move |t| {
            let mut validated = TransformState::default();
            validated.set_brightness(params.brightness)?;
            validated.set_contrast(params.contrast)?;
            validated.set_saturation(params.saturation)?;
            validated.set_tint(params.tint_degrees)?;
            validated.set_temperature(params.temperature)?;
            validated.set_clarity(params.clarity)?;
            if let Some(kind) = params.filter {
                validated.set_filter(kind, params.filter_intensity)?;
            }
            validated.rotation = params.rotation;
            validated.flipped = params.flipped;
            *t = validated;
            Ok(())
        })
    }

    fn adjust(
        &mut self,
        mutate: impl FnOnce(&mut TransformState) -> Result<(), EngineError>,
    ) -> Result<(), EngineError> {
        self.require_editable()?;
        mutate(&mut self.transform)?;
        self.render_current();
        self.debouncer.touch(Instant::now());
        Ok(())
    }

    /// The settle event: capture the rendered frame into history and clear
    /// the pending debounce. Safe to call with no pending change — an
    /// identical frame is dropped by the store.
    pub fn settle(&mut self) -> Result<CommitOutcome, EngineError> {
        self.require_editable()?;
        self.debouncer.reset();
        self.commit_frame()
    }

    /// Commit only if the quiet period has elapsed. Returns `None` when
    /// nothing was due.
    pub fn poll_settle(&mut self, now: Instant) -> Result<Option<CommitOutcome>, EngineError> {
        if self.state != SessionState::Loaded || !self.debouncer.due(now) {
            return Ok(None);
        }
        Ok(Some(self.settle()?))
    }

    /// A continuous change is waiting for its settle event.
    pub fn settle_pending(&self) -> bool {
        self.debouncer.pending()
    }

    // ------------------------------------------------------------------
    // Discrete operations (commit immediately)
    // ------------------------------------------------------------------

    /// Rotate 90° clockwise.
    pub fn rotate_cw(&mut self) -> Result<CommitOutcome, EngineError> {
        self.require_editable()?;
        self.transform.rotation = self.transform.rotation.rotated_cw();
        self.render_current();
        self.commit_frame()
    }

    /// Toggle the horizontal mirror.
    pub fn flip(&mut self) -> Result<CommitOutcome, EngineError> {
        self.require_editable()?;
        self.transform.flipped = !self.transform.flipped;
        self.render_current();
        self.commit_frame()
    }

    /// Select a named filter preset at the given intensity.
    pub fn apply_filter(
        &mut self,
        kind: FilterKind,
        intensity: f32,
    ) -> Result<CommitOutcome, EngineError> {
        self.require_editable()?;
        self.transform.set_filter(kind, intensity)?;
        self.render_current();
        self.commit_frame()
    }

    /// Back to "no filter".
    pub fn clear_filter(&mut self) -> Result<CommitOutcome, EngineError> {
        self.require_editable()?;
        self.transform.clear_filter();
        self.render_current();
        self.commit_frame()
    }

    // ------------------------------------------------------------------
    // Crop
    // ------------------------------------------------------------------

    /// Activate the crop overlay; transform edits are suspended until the
    /// crop is applied or cancelled.
    pub fn enter_crop(&mut self) -> Result<(), EngineError> {
        self.require_editable()?;
        self.state = SessionState::CropPending;
        Ok(())
    }

    /// Crop the *rendered* frame to the region (clamped to frame bounds) and
    /// make the result the new bitmap. Like undo/redo restores, the cropped
    /// frame is a flattened render, so the transform resets to neutral.
    pub fn apply_crop(&mut self, region: CropRegion) -> Result<CommitOutcome, EngineError> {
        if self.state != SessionState::CropPending {
            return Err(EngineError::Suspended("no crop is pending"));
        }
        let frame = self.frame.as_ref().ok_or(EngineError::NoImage)?;
        let clamped = region
            .clamped_to(frame.width(), frame.height())
            .ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "crop region {region:?} does not intersect the {}x{} frame",
                    frame.width(),
                    frame.height()
                ))
            })?;
        let cropped = image::imageops::crop_imm(
            frame,
            clamped.x,
            clamped.y,
            clamped.width,
            clamped.height,
        )
        .to_image();
        info!(
            "session {}: cropped to {}x{} at ({}, {})",
            self.id, clamped.width, clamped.height, clamped.x, clamped.y
        );
        self.bitmap = Some(cropped);
        self.transform = TransformState::default();
        self.state = SessionState::Loaded;
        self.render_current();
        self.commit_frame()
    }

    /// Leave crop mode without mutating anything.
    pub fn cancel_crop(&mut self) -> Result<(), EngineError> {
        if self.state != SessionState::CropPending {
            return Err(EngineError::Suspended("no crop is pending"));
        }
        self.state = SessionState::Loaded;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    /// Step back one committed state. `Ok(false)` when there is nothing to
    /// undo. The restored snapshot is a flattened render, so the transform
    /// resets to neutral — replaying the stale transform would double-apply.
    pub fn undo(&mut self) -> Result<bool, EngineError> {
        self.require_editable()?;
        match self.history.undo()? {
            Some(bitmap) => {
                self.restore(bitmap);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Step forward one undone state. `Ok(false)` when the redo stack is
    /// empty.
    pub fn redo(&mut self) -> Result<bool, EngineError> {
        self.require_editable()?;
        match self.history.redo()? {
            Some(bitmap) => {
                self.restore(bitmap);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn restore(&mut self, bitmap: RgbaImage) {
        self.bitmap = Some(bitmap);
        self.transform = TransformState::default();
        self.debouncer.reset();
        self.render_current();
    }

    // ------------------------------------------------------------------
    // Remote enhancement
    // ------------------------------------------------------------------

    /// Start a remote round-trip: capture the current frame losslessly and
    /// move to `AwaitingRemote`. A second request while one is in flight is
    /// rejected with `RemoteBusy`, never queued.
    pub fn begin_remote(&mut self) -> Result<RemoteTicket, EngineError> {
        match self.state {
            SessionState::Empty => return Err(EngineError::NoImage),
            SessionState::CropPending => return Err(EngineError::Suspended("a crop is pending")),
            SessionState::AwaitingRemote => return Err(EngineError::RemoteBusy),
            SessionState::Loaded => {}
        }
        let frame = self.frame.as_ref().ok_or(EngineError::NoImage)?;
        let frame_png = io::encode_png(frame)?;
        self.state = SessionState::AwaitingRemote;
        debug!(
            "session {}: remote request started (generation {})",
            self.id, self.generation
        );
        Ok(RemoteTicket {
            generation: self.generation,
            frame_png,
        })
    }

    /// Complete a remote round-trip with the service's encoded result.
    /// Returns `Ok(false)` when the ticket is stale (the session was
    /// cancelled or reloaded since `begin_remote`) and the result was
    /// discarded. Remote results are pre-rendered, so the transform resets
    /// to neutral and the new bitmap is committed to history.
    pub fn apply_remote_result(
        &mut self,
        ticket: RemoteTicket,
        encoded: &[u8],
    ) -> Result<bool, EngineError> {
        if ticket.generation != self.generation {
            info!(
                "session {}: discarding stale remote result (ticket generation {}, now {})",
                self.id, ticket.generation, self.generation
            );
            return Ok(false);
        }
        let bitmap = match io::decode_bitmap(encoded) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                // The attempt is over either way; the session stays usable.
                self.state = SessionState::Loaded;
                return Err(e);
            }
        };
        self.restore(bitmap);
        self.state = SessionState::Loaded;
        self.commit_frame()?;
        Ok(true)
    }

    /// Abandon a failed remote round-trip; the session returns to `Loaded`
    /// unchanged. Stale tickets are ignored.
    pub fn fail_remote(&mut self, ticket: RemoteTicket) {
        if ticket.generation != self.generation {
            return;
        }
        if self.state == SessionState::AwaitingRemote {
            self.state = SessionState::Loaded;
        }
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Encode the current frame for download.
    pub fn export(
        &self,
        format: io::ExportFormat,
        quality: u8,
    ) -> Result<Vec<u8>, EngineError> {
        let frame = self.frame.as_ref().ok_or(EngineError::NoImage)?;
        io::encode_frame(frame, format, quality)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require_editable(&self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Loaded => Ok(()),
            SessionState::Empty => Err(EngineError::NoImage),
            SessionState::CropPending => Err(EngineError::Suspended("a crop is pending")),
            SessionState::AwaitingRemote => Err(EngineError::RemoteBusy),
        }
    }

    /// The single redraw path: every mutation funnels through here, so the
    /// frame always matches the committed transform state.
    fn render_current(&mut self) {
        self.frame = self
            .bitmap
            .as_ref()
            .map(|bitmap| render::render(bitmap, &self.transform));
    }

    fn commit_frame(&mut self) -> Result<CommitOutcome, EngineError> {
        let frame = self.frame.as_ref().ok_or(EngineError::NoImage)?;
        self.history.commit(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 5 % 256) as u8, (y * 9 % 256) as u8, 60, 255])
        })
    }

    fn loaded_session() -> EditSession {
        let mut session = EditSession::default();
        session.load(gradient(100, 200)).unwrap();
        session
    }

    #[test]
    fn load_seeds_history_with_pristine_snapshot() {
        let session = loaded_session();
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.history().undo_len(), 1);
        assert_eq!(session.frame().unwrap().dimensions(), (100, 200));
    }

    #[test]
    fn operations_require_an_image() {
        let mut session = EditSession::default();
        assert!(matches!(session.set_brightness(1.2), Err(EngineError::NoImage)));
        assert!(matches!(session.rotate_cw(), Err(EngineError::NoImage)));
        assert!(matches!(session.begin_remote(), Err(EngineError::NoImage)));
    }

    #[test]
    fn rotate_swaps_frame_dimensions_and_commits() {
        let mut session = loaded_session();
        session.rotate_cw().unwrap();
        assert_eq!(session.frame().unwrap().dimensions(), (200, 100));
        assert_eq!(session.history().undo_len(), 2);

        session.rotate_cw().unwrap();
        assert_eq!(session.frame().unwrap().dimensions(), (100, 200));
        assert_eq!(session.history().undo_len(), 3);
    }

    #[test]
    fn four_rotations_return_to_identity() {
        let mut session = loaded_session();
        for _ in 0..4 {
            session.rotate_cw().unwrap();
        }
        assert_eq!(session.transform().rotation.degrees(), 0);
        assert_eq!(session.frame().unwrap(), session.bitmap().unwrap());
    }

    #[test]
    fn sliders_do_not_commit_until_settle() {
        let mut session = loaded_session();
        for step in 1..=10 {
            session.set_brightness(1.0 + step as f32 / 20.0).unwrap();
        }
        assert_eq!(session.history().undo_len(), 1);
        assert!(session.settle_pending());

        let outcome = session.settle().unwrap();
        assert_eq!(outcome, CommitOutcome::Recorded);
        assert_eq!(session.history().undo_len(), 2);
        assert!(!session.settle_pending());
    }

    #[test]
    fn settle_with_no_change_records_nothing() {
        let mut session = loaded_session();
        assert_eq!(session.settle().unwrap(), CommitOutcome::Unchanged);
        assert_eq!(session.history().undo_len(), 1);
    }

    #[test]
    fn poll_settle_waits_for_the_quiet_period() {
        let mut session = EditSession::new(SessionConfig {
            settle_delay: Duration::from_millis(400),
            ..SessionConfig::default()
        });
        session.load(gradient(40, 30)).unwrap();
        session.set_contrast(1.4).unwrap();

        let now = Instant::now();
        assert!(session.poll_settle(now).unwrap().is_none());
        let later = now + Duration::from_millis(401);
        assert_eq!(
            session.poll_settle(later).unwrap(),
            Some(CommitOutcome::Recorded)
        );
        // Nothing pending afterwards.
        assert!(session.poll_settle(later).unwrap().is_none());
    }

    #[test]
    fn undo_restores_previous_state_and_resets_transform() {
        let mut session = loaded_session();
        session.rotate_cw().unwrap();
        assert_eq!(session.frame().unwrap().dimensions(), (200, 100));

        assert!(session.undo().unwrap());
        assert_eq!(session.frame().unwrap().dimensions(), (100, 200));
        assert!(session.transform().is_neutral());

        assert!(session.redo().unwrap());
        assert_eq!(session.frame().unwrap().dimensions(), (200, 100));
    }

    #[test]
    fn undo_at_the_pristine_state_is_a_noop() {
        let mut session = loaded_session();
        let before = session.frame().unwrap().clone();
        assert!(!session.undo().unwrap());
        assert_eq!(session.frame().unwrap(), &before);
        assert_eq!(session.history().undo_len(), 1);
        assert_eq!(session.history().redo_len(), 0);
    }

    #[test]
    fn new_commit_after_undo_clears_redo() {
        let mut session = loaded_session();
        session.rotate_cw().unwrap();
        session.undo().unwrap();
        assert!(session.history().can_redo());

        session.flip().unwrap();
        assert!(!session.history().can_redo());
        assert!(!session.redo().unwrap());
    }

    #[test]
    fn crop_flattens_and_commits() {
        let mut session = loaded_session();
        session.enter_crop().unwrap();
        assert_eq!(session.state(), SessionState::CropPending);
        // Transform edits are suspended while cropping.
        assert!(matches!(
            session.set_brightness(1.5),
            Err(EngineError::Suspended(_))
        ));

        session.apply_crop(CropRegion::new(10, 20, 50, 60)).unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.frame().unwrap().dimensions(), (50, 60));
        assert!(session.transform().is_neutral());
        assert_eq!(session.history().undo_len(), 2);
    }

    #[test]
    fn crop_region_is_clamped_to_frame_bounds() {
        let mut session = loaded_session();
        session.enter_crop().unwrap();
        session.apply_crop(CropRegion::new(90, 190, 500, 500)).unwrap();
        assert_eq!(session.frame().unwrap().dimensions(), (10, 10));
    }

    #[test]
    fn crop_outside_the_frame_is_rejected() {
        let mut session = loaded_session();
        session.enter_crop().unwrap();
        let err = session.apply_crop(CropRegion::new(500, 500, 10, 10)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        // Still crop-pending; cancel returns to Loaded without mutation.
        assert_eq!(session.state(), SessionState::CropPending);
        session.cancel_crop().unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.frame().unwrap().dimensions(), (100, 200));
    }

    #[test]
    fn second_remote_request_is_rejected_busy() {
        let mut session = loaded_session();
        let ticket = session.begin_remote().unwrap();
        assert_eq!(session.state(), SessionState::AwaitingRemote);

        assert!(matches!(session.begin_remote(), Err(EngineError::RemoteBusy)));

        // Exactly one replacement happens.
        let result = io::encode_png(&gradient(10, 10)).unwrap();
        assert!(session.apply_remote_result(ticket, &result).unwrap());
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.frame().unwrap().dimensions(), (10, 10));
        assert_eq!(session.history().undo_len(), 2);
    }

    #[test]
    fn remote_failure_returns_to_loaded_unchanged() {
        let mut session = loaded_session();
        let before = session.frame().unwrap().clone();
        let ticket = session.begin_remote().unwrap();
        session.fail_remote(ticket);
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.frame().unwrap(), &before);
        assert_eq!(session.history().undo_len(), 1);
    }

    #[test]
    fn remote_result_decode_failure_is_recoverable() {
        let mut session = loaded_session();
        let before = session.frame().unwrap().clone();
        let ticket = session.begin_remote().unwrap();
        let err = session.apply_remote_result(ticket, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.frame().unwrap(), &before);
    }

    #[test]
    fn stale_remote_result_is_discarded() {
        let mut session = loaded_session();
        let ticket = session.begin_remote().unwrap();

        // A new image arrives while the request is in flight.
        session.load(gradient(30, 30)).unwrap();

        let result = io::encode_png(&gradient(10, 10)).unwrap();
        assert!(!session.apply_remote_result(ticket, &result).unwrap());
        assert_eq!(session.frame().unwrap().dimensions(), (30, 30));
    }

    #[test]
    fn cancel_clears_everything_from_any_state() {
        let mut session = loaded_session();
        session.rotate_cw().unwrap();
        session.enter_crop().unwrap();

        session.cancel();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.bitmap().is_none());
        assert!(session.frame().is_none());
        assert!(session.history().is_empty());
        assert!(session.transform().is_neutral());
    }

    #[test]
    fn filter_apply_and_clear_commit() {
        let mut session = loaded_session();
        session.apply_filter(FilterKind::Noir, 1.0).unwrap();
        assert_eq!(session.history().undo_len(), 2);
        assert_eq!(session.transform().filter, Some(FilterKind::Noir));

        session.clear_filter().unwrap();
        assert!(session.transform().filter.is_none());
        assert_eq!(session.history().undo_len(), 3);
    }

    #[test]
    fn invalid_slider_value_keeps_prior_state() {
        let mut session = loaded_session();
        session.set_brightness(1.2).unwrap();
        let err = session.set_brightness(99.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert!((session.transform().brightness - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn apply_transform_validates_the_whole_parameter_set() {
        let mut session = loaded_session();
        let mut params = TransformState::default();
        params.set_contrast(1.4).unwrap();
        params.rotation = crate::transform::Rotation::Deg90;
        params.flipped = true;
        session.apply_transform(params).unwrap();
        assert!((session.transform().contrast - 1.4).abs() < f32::EPSILON);
        assert_eq!(session.frame().unwrap().dimensions(), (200, 100));

        // A sidecar with out-of-range values is rejected wholesale.
        let mut bad = TransformState::default();
        bad.brightness = 99.0;
        let err = session.apply_transform(bad).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert!((session.transform().contrast - 1.4).abs() < f32::EPSILON);
    }

    #[test]
    fn export_encodes_the_current_frame() {
        let mut session = loaded_session();
        session.rotate_cw().unwrap();
        let bytes = session.export(io::ExportFormat::Png, 95).unwrap();
        let decoded = io::decode_bitmap(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (200, 100));
    }
}

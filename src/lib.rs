//! photoflow — a headless raster photo-editing engine.
//!
//! The crate owns the in-memory image state of an editor: a deterministic
//! transform pipeline (rotate / flip / adjustments / named filters) renders
//! frames from a source bitmap, a bounded history of compressed snapshots
//! provides undo/redo, and an [`EditSession`] state machine orchestrates the
//! two plus round-trips to a remote enhancement service.
//!
//! ```no_run
//! use photoflow::prelude::*;
//!
//! # fn main() -> Result<(), photoflow::EngineError> {
//! let mut session = EditSession::default();
//! session.load(photoflow::io::load_bitmap("photo.jpg".as_ref())?)?;
//! session.set_brightness(1.2)?;
//! session.settle()?;
//! session.rotate_cw()?;
//! session.undo()?;
//! let png = session.export(ExportFormat::Png, 95)?;
//! # let _ = png;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod filters;
pub mod history;
pub mod io;
pub mod remote;
pub mod render;
pub mod session;
pub mod transform;

pub use error::EngineError;
pub use filters::{FilterKind, FilterStep};
pub use history::{CommitOutcome, HistoryConfig, HistoryStore, Snapshot};
pub use remote::{RemoteClient, RemoteOperation};
pub use render::render;
pub use session::{CropRegion, EditSession, RemoteTicket, SessionConfig, SessionState};
pub use transform::{Rotation, TransformState};

/// The common imports for library consumers.
pub mod prelude {
    pub use crate::error::EngineError;
    pub use crate::filters::FilterKind;
    pub use crate::history::CommitOutcome;
    pub use crate::io::ExportFormat;
    pub use crate::remote::{RemoteClient, RemoteOperation};
    pub use crate::session::{CropRegion, EditSession, SessionConfig, SessionState};
    pub use crate::transform::Rotation;
}

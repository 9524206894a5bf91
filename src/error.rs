// ============================================================================
// ERROR TAXONOMY — every failure in the engine is locally recoverable
// ============================================================================
//
// None of these abort the process. Decode/remote failures leave the session's
// displayed state untouched; invalid inputs are rejected at the setter
// boundary with the prior state retained. An exhausted undo/redo stack is a
// silent no-op (`Ok(None)`), not an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A bitmap or history snapshot could not be decoded.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// A frame could not be encoded for history, export or upload.
    #[error("image encode failed: {0}")]
    Encode(String),

    /// The remote enhancement service could not be reached.
    #[error("remote request failed: {0}")]
    Remote(#[from] reqwest::Error),

    /// The remote enhancement service answered with a non-2xx status.
    #[error("remote service returned HTTP {0}")]
    RemoteStatus(u16),

    /// A second remote request was attempted while one is already in flight.
    /// Requests are rejected, never queued: an enhancement replaces the whole
    /// bitmap and overlapping replacements are undefined.
    #[error("a remote enhancement request is already in flight")]
    RemoteBusy,

    /// An out-of-domain parameter was rejected at the setter boundary.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation requires a loaded image.
    #[error("no image loaded")]
    NoImage,

    /// The operation is not available in the session's current state
    /// (e.g. transform edits while a crop overlay is pending).
    #[error("operation not available: {0}")]
    Suspended(&'static str),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

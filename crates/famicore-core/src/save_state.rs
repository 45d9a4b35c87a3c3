//! Save-state format constants and errors.
//!
//! A state blob is the 4-byte magic followed by the byte-oriented
//! concatenation of each subsystem's serialized state:
//!
//! ```text
//! "FCS1"
//! CPU registers + cycle counters
//! PPU registers, scroll state, OAM, palette, timing, pipeline
//! APU channels + frame counter
//! 2 KiB system RAM
//! 2 KiB CIRAM
//! controller 1, controller 2
//! mapper-private state: u32 length + bytes (includes PRG-RAM / CHR-RAM)
//! ```
//!
//! Saving the same state twice produces byte-identical blobs.

/// Magic prefix; the trailing digit versions the layout.
pub const SAVE_STATE_MAGIC: &[u8; 4] = b"FCS1";

/// Errors raised while loading a save state.
#[derive(Debug, thiserror::Error)]
pub enum SaveStateError {
    /// The blob does not start with the expected magic.
    #[error("not a famicore save state (bad magic)")]
    BadMagic,

    /// The blob ends before all subsystem state was restored.
    #[error("save state truncated")]
    Truncated,
}

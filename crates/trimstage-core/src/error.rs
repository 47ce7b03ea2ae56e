//! Error types for trimstage.
//!
//! Only setup-time and control-thread operations can fail. The per-block
//! path never returns an error: it clamps, defaults, or grows its scratch
//! storage instead.

use thiserror::Error;

use crate::midi_cc::CcTarget;

/// Errors raised while preparing the processor or restoring state.
#[derive(Debug, Error, PartialEq)]
pub enum PluginError {
    /// The host offered a channel layout the gain stage does not support.
    #[error("unsupported bus layout: {inputs} in / {outputs} out")]
    UnsupportedLayout { inputs: u32, outputs: u32 },

    /// Sample rate was zero, negative or not finite.
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    /// Maximum block size was zero.
    #[error("maximum block size must be non-zero")]
    InvalidBlockSize,

    /// A MIDI controller is assigned to a gain stage the layout does not run.
    #[error("CC {controller} drives {target:?}, which the stage layout does not use")]
    InactiveCcTarget { controller: u8, target: CcTarget },

    /// A state blob could not be restored.
    #[error("state error: {0}")]
    State(#[from] StateError),
}

/// Reasons a state blob is rejected. A rejected blob is never partially
/// applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("state blob is empty")]
    Empty,

    #[error("state blob has no trimstage header")]
    BadMagic,

    #[error("unsupported state version {0}")]
    UnsupportedVersion(u16),

    #[error("state blob truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("invalid parameter identifier at byte {offset}")]
    InvalidIdentifier { offset: usize },
}

/// Result type for trimstage operations.
pub type PluginResult<T> = Result<T, PluginError>;

use thiserror::Error;

use crate::enums::OverlayKind;
use crate::volume::VolumeId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("No volumes registered")]
    EmptyRegistry,

    #[error("No global frame available for slicing")]
    NoFrame,

    /// The percentile window has zero width (constant-valued volume).
    #[error("Degenerate intensity range at {0}")]
    DegenerateRange(f32),

    #[error("No {0} overlay attached")]
    MissingOverlay(OverlayKind),

    #[error("Unknown volume: {0}")]
    UnknownVolume(VolumeId),
}

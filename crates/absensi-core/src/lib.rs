//! absensi-core — Face detection, signature extraction and roster matching.
//!
//! Uses SCRFD for face detection and ArcFace for face signatures, both
//! running via ONNX Runtime for CPU inference. Matching is a nearest-neighbour
//! search over the roster with a distance tolerance.

pub mod alignment;
pub mod detector;
pub mod encoder;
pub mod recognizer;
pub mod types;

use std::path::PathBuf;

pub use encoder::{decode_image, EncodeError, FaceEncoder, OnnxFaceEncoder};
pub use types::{
    BoundingBox, DistanceMatcher, FaceSignature, MatchResult, Matcher, Roster, RosterEntry,
    DEFAULT_TOLERANCE, UNKNOWN_LABEL,
};

/// Default location of the ONNX model files.
///
/// `$XDG_DATA_HOME/absensi/models`, falling back to `~/.local/share/absensi/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("absensi")
        .join("models")
}

use serde::{Deserialize, Serialize};

/// Label reported for a face that matches nobody on the roster.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Maximum signature distance accepted as the same person.
///
/// Signatures are L2-normalized, so Euclidean distance `d` and cosine
/// similarity `s` are tied by `d = sqrt(2 - 2s)`. 1.1 is cosine ~0.40, the
/// usual ArcFace verification point. The 0.5 used by 128-d dlib encodings
/// would demand cosine 0.875 here and reject most genuine pairs.
pub const DEFAULT_TOLERANCE: f32 = 1.1;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Fixed-length vector describing one face (512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSignature {
    pub values: Vec<f32>,
    /// Model version that produced this signature (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl FaceSignature {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Euclidean distance between two signatures. Lower = more similar.
    pub fn distance(&self, other: &FaceSignature) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A known person: display name plus the signature computed from their photo.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub name: String,
    pub signature: FaceSignature,
}

/// The set of known people faces are identified against.
///
/// Built once per synchronization cycle with [`push`](Self::push), then shared
/// read-only behind an `Arc` until the next cycle replaces it.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, signature: FaceSignature) {
        self.entries.push(RosterEntry {
            name: name.into(),
            signature,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

impl FromIterator<(String, FaceSignature)> for Roster {
    fn from_iter<I: IntoIterator<Item = (String, FaceSignature)>>(iter: I) -> Self {
        let mut roster = Roster::new();
        for (name, signature) in iter {
            roster.push(name, signature);
        }
        roster
    }
}

/// Result of matching a probe signature against the roster.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    /// Distance to the closest roster entry (`f32::INFINITY` for an empty roster).
    pub distance: f32,
    /// Name of the matched entry (if any).
    pub name: Option<String>,
}

impl MatchResult {
    fn unmatched(distance: f32) -> Self {
        Self {
            matched: false,
            distance,
            name: None,
        }
    }

    /// Name to report for this face.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_LABEL)
    }
}

/// Strategy for comparing a probe signature against the roster.
pub trait Matcher {
    fn compare(&self, probe: &FaceSignature, entries: &[RosterEntry]) -> MatchResult;
}

/// Nearest-neighbour matcher with a distance tolerance.
///
/// Only the closest entry is considered; it is accepted when its distance is
/// within `tolerance`. On equal distances the earliest entry wins.
#[derive(Debug, Clone, Copy)]
pub struct DistanceMatcher {
    pub tolerance: f32,
}

impl Default for DistanceMatcher {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Matcher for DistanceMatcher {
    fn compare(&self, probe: &FaceSignature, entries: &[RosterEntry]) -> MatchResult {
        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, entry) in entries.iter().enumerate() {
            let dist = probe.distance(&entry.signature);
            if best_idx.is_none() || dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_dist <= self.tolerance => MatchResult {
                matched: true,
                distance: best_dist,
                name: Some(entries[idx].name.clone()),
            },
            _ => MatchResult::unmatched(best_dist),
        }
    }
}

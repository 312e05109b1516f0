//! Face classification by matching gravity against per-face reference
//! directions.
//!
//! When a face rests up, the accelerometer measures ~1 g along that face's
//! outward normal. The classifier projects the filtered reading onto every
//! reference direction and accepts the face whose projection clears
//! `gravity - tolerance`.
//!
//! Adjacent dodecahedron faces are 63.4° apart while the default acceptance
//! cone is ~37°, so a reading near an edge can clear the threshold for two
//! faces. The largest projection wins; exact ties keep table order.

use serde::{Deserialize, Serialize};

use super::median::median_vector;
use super::Vector3;
use crate::config::{FaceIndex, FACE_COUNT};

/// Normal components of a regular dodecahedron: 1/√(1+φ²) and φ/√(1+φ²).
const A: f32 = 0.525_731_1;
const B: f32 = 0.850_650_8;

/// Unit face normals, indexed by face number. Face `i` and `i + 6` are
/// opposite faces.
pub const DODECAHEDRON_FACES: [Vector3; FACE_COUNT] = [
    Vector3::new(0.0, A, B),
    Vector3::new(0.0, -A, B),
    Vector3::new(B, 0.0, A),
    Vector3::new(-B, 0.0, A),
    Vector3::new(A, B, 0.0),
    Vector3::new(-A, B, 0.0),
    Vector3::new(0.0, -A, -B),
    Vector3::new(0.0, A, -B),
    Vector3::new(-B, 0.0, -A),
    Vector3::new(B, 0.0, -A),
    Vector3::new(-A, -B, 0.0),
    Vector3::new(A, -B, 0.0),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Expected gravity magnitude, m/s².
    pub gravity: f32,
    /// Allowed shortfall of the projection below `gravity`.
    pub tolerance: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            tolerance: 2.0,
        }
    }
}

impl ClassifierConfig {
    pub fn threshold(&self) -> f32 {
        self.gravity - self.tolerance
    }
}

#[derive(Debug, Clone)]
pub struct OrientationClassifier {
    references: [Vector3; FACE_COUNT],
    threshold: f32,
}

impl OrientationClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self::with_references(DODECAHEDRON_FACES, config.threshold())
    }

    pub fn with_references(references: [Vector3; FACE_COUNT], threshold: f32) -> Self {
        Self {
            references,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Median-filter a burst and classify the result.
    pub fn classify(&self, samples: &[Vector3]) -> Option<FaceIndex> {
        let estimate = median_vector(samples)?;
        self.match_vector(&estimate)
    }

    /// Best-matching face for a single filtered vector, or `None` while the
    /// device is in transit.
    pub fn match_vector(&self, vector: &Vector3) -> Option<FaceIndex> {
        let mut best: Option<(FaceIndex, f32)> = None;

        for (face, reference) in FaceIndex::all().zip(self.references.iter()) {
            let projection = vector.dot(reference);
            if projection <= self.threshold {
                continue;
            }
            match best {
                Some((_, best_projection)) if projection <= best_projection => {}
                _ => best = Some((face, projection)),
            }
        }

        best.map(|(face, _)| face)
    }
}

impl Default for OrientationClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

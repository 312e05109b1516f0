//! Per-axis median filter.
//!
//! A burst of raw samples is reduced to one vector whose components are the
//! independent medians of each axis. A single spiking sample cannot move the
//! estimate, which is all the classifier needs from a resting device.

use super::Vector3;

/// Median of a slice of finite values. Returns `None` for an empty slice.
///
/// Odd lengths give the middle element; even lengths give the mean of the
/// two middle elements.
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Per-axis median of a burst. Non-finite samples are dropped first; a burst
/// with no usable samples has no estimate.
pub fn median_vector(samples: &[Vector3]) -> Option<Vector3> {
    let usable: Vec<&Vector3> = samples.iter().filter(|s| s.is_finite()).collect();
    if usable.is_empty() {
        return None;
    }

    let xs: Vec<f32> = usable.iter().map(|s| s.x).collect();
    let ys: Vec<f32> = usable.iter().map(|s| s.y).collect();
    let zs: Vec<f32> = usable.iter().map(|s| s.z).collect();

    Some(Vector3::new(median(&xs)?, median(&ys)?, median(&zs)?))
}

//! Distance functions used by [`crate::VectorIndex`]. Both are symmetric in
//! their arguments and assume equal-length inputs.

pub use ragdb_core::config::DistanceMetric;

pub fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_distance(a, b),
        DistanceMetric::Euclidean => euclidean_distance(a, b),
    }
}

/// `1 - cos(a, b)`, clamped to `[0, 2]`. Two zero vectors are identical
/// (`0.0`); a single zero vector is orthogonal to everything (`1.0`).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a == 0.0 && mag_b == 0.0 {
        return 0.0;
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 1.0;
    }
    let similarity = (dot(a, b) / (mag_a * mag_b)).clamp(-1.0, 1.0);
    1.0 - similarity
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(p, q)| (p - q) * (p - q)).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(p, q)| p * q).sum()
}

fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

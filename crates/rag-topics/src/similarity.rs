//! Vector similarity functions.

use crate::error::TopicsError;

/// Calculate cosine similarity between two vectors.
///
/// Returns a value in [-1.0, 1.0] where 1.0 = identical direction.
/// Vectors must have the same nonzero length and neither may be all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, TopicsError> {
    if a.len() != b.len() {
        return Err(TopicsError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    if a.is_empty() {
        return Err(TopicsError::EmptyVector);
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(TopicsError::ZeroVector);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return Err(TopicsError::NonFinite);
    }

    // Rounding can push |sim| a hair past 1.
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

use serde::{Deserialize, Serialize};

/// An opaque cached value: a parsed proposer candidate list for the
/// `propose` namespace, raw evaluation scores for the `evaluate` namespace.
/// Kept as `serde_json::Value` so the cache stays payload-agnostic across
/// namespaces — each caller (de)serializes its own shape.
pub type CachePayload = serde_json::Value;

/// One entry in the semantic cache's per-namespace vector index.
/// `vector` is always L2-normalized so lookup reduces to an inner product
/// (`spec.md` §3/§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub vector: Vec<f32>,
    pub namespace: String,
    pub payload: CachePayload,
}

pub(crate) fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

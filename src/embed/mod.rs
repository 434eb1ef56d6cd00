pub mod ollama;

use anyhow::Result;

pub type Embedding = Vec<f32>;

/// Text-to-vector capability. Implementations must be deterministic for a
/// given input and are shared across concurrently handled requests.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Embedding>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
    /// Output width, or 0 when unknown.
    fn dimensions(&self) -> usize;
    fn model_name(&self) -> &str;
}

/// Cosine similarity, defined as 0 when either vector has zero norm or the
/// result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    let sim = dot / denom;
    if sim.is_finite() { sim.clamp(-1.0, 1.0) } else { 0.0 }
}

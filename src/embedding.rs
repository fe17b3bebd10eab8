//! Local, deterministic text embedder.
//!
//! Feature-hashed bag of word unigrams and bigrams: each token is hashed
//! into one of `dim` buckets with a sign bit, accumulated, then
//! L2-normalized. A pure function of its input, so index-build and query
//! embeddings never disagree and there is no network or quota failure mode.

use sha2::{Digest, Sha256};

pub const EMBEDDING_DIM: usize = 384;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "embedding dimension must be positive");
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embeds `text` into a fixed-dimension unit vector. Identical input
    /// produces a bit-identical vector across calls and processes.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];

        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        for token in &tokens {
            self.accumulate(&mut vector, token);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]));
        }

        l2_normalize(&mut vector);
        vector
    }

    fn accumulate(&self, vector: &mut [f32], token: &str) {
        let digest = Sha256::digest(token.as_bytes());
        let bucket = u64::from_le_bytes(digest[0..8].try_into().unwrap_or([0; 8]));
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[(bucket % self.dim as u64) as usize] += sign;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

//! Hashing-trick embedder
//!
//! Needs no network or model files. Each unigram, bigram and trigram of the
//! normalized text is hashed to one signed position of a fixed-size vector.
//! Two queries sharing words and word sequences land on the same positions,
//! so paraphrases of short search queries end up close in cosine terms.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Vector size produced by [`HashEmbedder::default`]
pub const HASH_DIMENSIONS: usize = 256;

/// Hash vectors score lower than neural embeddings for the same paraphrase
const HASH_THRESHOLD: f32 = 0.20;

const MODEL_NAME: &str = "hash-ngram-sha256";

/// Deterministic embedder based on feature hashing
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(HASH_DIMENSIONS)
    }
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Compute the embedding synchronously
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let position = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
            let sign_bits = u32::from_be_bytes([digest[4], digest[5], digest[6], digest[7]]);

            let index = position as usize % self.dimensions;
            vector[index] += if sign_bits % 2 == 0 { 1.0 } else { -1.0 };
        }

        normalize(&mut vector);
        vector
    }
}

/// Lowercase, replace non-alphanumerics with spaces, then emit n-grams of 1-3 words
fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();

    let mut tokens: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    for n in 2..=3 {
        tokens.extend(words.windows(n).map(|gram| gram.join("_")));
    }
    tokens
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn recommended_threshold(&self) -> f32 {
        HASH_THRESHOLD
    }
}

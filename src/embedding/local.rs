//! Offline feature-hashing embedder.
//!
//! Lowercased words and their character trigrams are hashed into a fixed
//! number of buckets and the resulting vector is L2-normalised. Texts that
//! share words or word fragments ("intro" / "introduction") land close
//! together, which is enough for course-name resolution and for tests.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic embedder that needs no network access.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let mut features: HashMap<String, f32> = HashMap::new();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            *features.entry(format!("w:{}", word)).or_insert(0.0) += WORD_WEIGHT;

            let chars: Vec<char> = word.chars().collect();
            for gram in chars.windows(3) {
                let gram: String = gram.iter().collect();
                *features.entry(format!("t:{}", gram)).or_insert(0.0) += TRIGRAM_WEIGHT;
            }
        }

        for (feature, weight) in &features {
            vector[djb2(feature) % self.dimensions] += weight;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(512)
    }
}

fn djb2(s: &str) -> usize {
    let mut hash: usize = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as usize);
    }
    hash
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

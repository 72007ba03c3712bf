//! Offline feature-hashing embedder.
//!
//! Lower-cased alphanumeric word unigrams and adjacent bigrams are hashed
//! with SHA-256 into `dims` signed buckets, then L2-normalized. Output is a
//! pure function of the input text, so identical texts always produce
//! bit-identical vectors.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;
use crate::error::Result;

pub struct HashProvider {
    model: String,
    dims: usize,
}

impl HashProvider {
    pub fn new(dims: usize) -> Self {
        Self {
            model: "hash-v1".to_string(),
            dims: dims.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dims];
        let tokens = tokenize(text);

        for token in &tokens {
            self.accumulate(&mut vec, token, 1.0);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&mut vec, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in vec.iter_mut() {
                *x /= norm;
            }
        }
        vec
    }

    fn accumulate(&self, vec: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let bucket = u64::from_le_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]) % self.dims as u64;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vec[bucket as usize] += sign * weight;
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[async_trait]
impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let provider = HashProvider::new(128);
        let a = provider.embed("The 2017 Toyota 86").await.unwrap();
        let b = provider.embed("The 2017 Toyota 86").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let provider = HashProvider::new(64);
        let texts = vec!["toyota 86".to_string(), "bmw m3".to_string()];
        let batch = provider.embed_batch(&texts).await.unwrap();
        for (text, vec) in texts.iter().zip(batch.iter()) {
            assert_eq!(&provider.embed(text).await.unwrap(), vec);
        }
    }

    #[test]
    fn test_shared_words_score_higher() {
        let provider = HashProvider::new(384);
        let query = provider.embed_text("horsepower of the Toyota 86");
        let toyota = provider.embed_text("The 2017 Toyota 86 is a Compact Coupe. Engine: 205 HP");
        let bmw = provider.embed_text("The 2011 BMW 1 Series M is a Compact Convertible");
        assert!(cosine_similarity(&query, &toyota) > cosine_similarity(&query, &bmw));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let provider = HashProvider::new(16);
        assert!(provider.embed_text("").iter().all(|x| *x == 0.0));
    }
}

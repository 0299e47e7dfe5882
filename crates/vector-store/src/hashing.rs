use crate::embeddings::{normalize, EmbeddingProvider};
use crate::error::Result;
use async_trait::async_trait;

/// Deterministic offline embedder.
///
/// Text is split into identifier-ish tokens (camelCase and snake_case are
/// broken into words, everything lowercased) and each token is hashed into a
/// signed bucket. Texts sharing vocabulary land close together, which is
/// enough for tests and for running without model files. Tokens that share a
/// bucket with opposite signs cancel, so a short text can embed to the zero
/// vector; it then scores 0 against everything.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_id: format!("hashing-{dimension}"),
        }
    }

    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let mut state = fnv1a_64(token.as_bytes());
            let bits = splitmix64(&mut state);
            let bucket = (bits % self.dimension as u64) as usize;
            let sign = if bits >> 63 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }
        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

/// Words of every identifier, plus the identifier itself with separators dropped.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for ident in text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty())
    {
        let words = split_identifier(ident);
        if words.len() > 1 {
            tokens.push(words.concat());
        }
        tokens.extend(words);
    }
    tokens
}

fn split_identifier(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    for part in ident.split('_').filter(|s| !s.is_empty()) {
        let chars: Vec<char> = part.chars().collect();
        let mut current = String::new();
        for (idx, &ch) in chars.iter().enumerate() {
            let boundary = idx > 0
                && ch.is_uppercase()
                && (chars[idx - 1].is_lowercase()
                    || chars[idx - 1].is_numeric()
                    || chars.get(idx + 1).is_some_and(|next| next.is_lowercase()));
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.extend(ch.to_lowercase());
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

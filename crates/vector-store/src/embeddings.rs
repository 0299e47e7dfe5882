use crate::error::{Result, VectorStoreError};
use crate::hashing::HashingEmbedder;
use crate::onnx::OnnxEmbedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

pub const EMBEDDING_MODE_ENV: &str = "DRIFT_EMBEDDING_MODE";

/// A backend that turns text into fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Offline feature hashing, no model files needed
    #[default]
    Hashing,
    /// Sentence-embedding model on ONNX Runtime
    Onnx,
}

impl EmbeddingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hashing => "hashing",
            Self::Onnx => "onnx",
        }
    }
}

impl std::str::FromStr for EmbeddingMode {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hashing" | "stub" => Ok(Self::Hashing),
            "onnx" | "fast" => Ok(Self::Onnx),
            other => Err(VectorStoreError::InvalidConfig(format!(
                "Unsupported embedding mode '{other}' (expected 'hashing' or 'onnx')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,

    /// Vector dimension; must match the model's output in onnx mode
    pub dimension: usize,

    /// Directory holding `model.onnx` and `tokenizer.json`
    pub model_dir: PathBuf,

    pub model_id: String,

    /// Inputs longer than this many characters are cut before embedding
    pub max_input_chars: usize,

    /// Texts per backend call
    pub batch_size: usize,

    /// Token limit for the onnx tokenizer
    pub max_length: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Hashing,
            dimension: 384,
            model_dir: PathBuf::from("models/all-MiniLM-L6-v2"),
            model_id: "all-MiniLM-L6-v2".to_string(),
            max_input_chars: 8192,
            batch_size: 32,
            max_length: 256,
        }
    }
}

impl EmbeddingConfig {
    /// Apply `DRIFT_EMBEDDING_MODE` when it is set.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(raw) = env::var(EMBEDDING_MODE_ENV) {
            self.mode = raw.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(VectorStoreError::InvalidConfig(
                "embedding dimension must be > 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(VectorStoreError::InvalidConfig(
                "embedding batch_size must be > 0".to_string(),
            ));
        }
        if self.max_input_chars == 0 {
            return Err(VectorStoreError::InvalidConfig(
                "max_input_chars must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Long-lived embedding front end shared by the indexer and callers.
///
/// Wraps a provider with input truncation, request batching and output
/// checks. A provider returning the wrong number of vectors or the wrong
/// dimension is an error, never silently patched up.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    max_input_chars: usize,
    batch_size: usize,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let defaults = EmbeddingConfig::default();
        Self {
            provider,
            max_input_chars: defaults.max_input_chars,
            batch_size: defaults.batch_size,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, max_input_chars: usize, batch_size: usize) -> Self {
        self.max_input_chars = max_input_chars.max(1);
        self.batch_size = batch_size.max(1);
        self
    }

    /// Build the backend selected by `config.mode`.
    ///
    /// The onnx model is not touched here; it loads on the first embed call.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        config.validate()?;
        let provider: Arc<dyn EmbeddingProvider> = match config.mode {
            EmbeddingMode::Hashing => Arc::new(HashingEmbedder::new(config.dimension)),
            EmbeddingMode::Onnx => Arc::new(OnnxEmbedder::new(
                config.model_id.clone(),
                config.model_dir.clone(),
                config.dimension,
                config.max_length,
            )),
        };
        log::debug!(
            "Embedding service: mode={} model={} dim={}",
            config.mode.as_str(),
            provider.model_id(),
            provider.dimension()
        );
        Ok(Self::new(provider).with_limits(config.max_input_chars, config.batch_size))
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::embedding("Empty embedding result"))
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let dimension = self.provider.dimension();
        let mut out = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let prepared: Vec<String> = batch
                .iter()
                .map(|text| truncate_graphemes(text, self.max_input_chars).to_string())
                .collect();

            let vectors = self.provider.embed_batch(&prepared).await?;
            if vectors.len() != prepared.len() {
                return Err(VectorStoreError::embedding(format!(
                    "Provider '{}' returned {} vectors for {} inputs",
                    self.provider.model_id(),
                    vectors.len(),
                    prepared.len()
                )));
            }
            for vector in &vectors {
                if vector.len() != dimension {
                    return Err(VectorStoreError::dimension(dimension, vector.len()));
                }
            }
            out.extend(vectors);
        }

        Ok(out)
    }
}

/// Longest prefix of `text` with at most `max_chars` chars that ends on a grapheme boundary.
pub(crate) fn truncate_graphemes(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars || text.chars().count() <= max_chars {
        return text;
    }

    let mut chars = 0;
    let mut end = 0;
    for (offset, grapheme) in text.grapheme_indices(true) {
        let width = grapheme.chars().count();
        if chars + width > max_chars {
            break;
        }
        chars += width;
        end = offset + grapheme.len();
    }
    &text[..end]
}

/// Cosine similarity of two vectors of equal length.
///
/// Zero-norm input scores `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(VectorStoreError::dimension(a.len(), b.len()));
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (norm_a * norm_b))
}

pub(crate) fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Echoes the input length into the first component and records batch sizes.
    struct RecordingProvider {
        dimension: usize,
        calls: AtomicUsize,
        seen: Mutex<Vec<usize>>,
        wrong_dimension: bool,
    }

    impl RecordingProvider {
        fn new(dimension: usize) -> Self {
            Self {
                dimension,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                wrong_dimension: false,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingProvider {
        fn model_id(&self) -> &str {
            "recording"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(texts.len());
            let dim = if self.wrong_dimension {
                self.dimension + 1
            } else {
                self.dimension
            };
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; dim];
                    v[0] = t.chars().count() as f32;
                    v
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn batches_preserve_order() {
        let provider = Arc::new(RecordingProvider::new(4));
        let service = EmbeddingService::new(provider.clone()).with_limits(100, 2);

        let texts: Vec<String> = (1..=5).map(|n| "x".repeat(n)).collect();
        let vectors = service.embed_batch(&texts).await.unwrap();

        let firsts: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(*provider.seen.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn long_inputs_are_truncated() {
        let provider = Arc::new(RecordingProvider::new(2));
        let service = EmbeddingService::new(provider).with_limits(8, 32);

        let vector = service.embed(&"a".repeat(100)).await.unwrap();
        assert_eq!(vector[0], 8.0);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let mut provider = RecordingProvider::new(3);
        provider.wrong_dimension = true;
        let service = EmbeddingService::new(Arc::new(provider));

        let err = service.embed("text").await.unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        ));
    }

    #[tokio::test]
    async fn empty_batch_skips_provider() {
        let provider = Arc::new(RecordingProvider::new(2));
        let service = EmbeddingService::new(provider.clone());
        assert!(service.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn truncation_respects_grapheme_boundaries() {
        // "e" + combining acute accent is one grapheme of two chars
        let text = "abe\u{301}cd";
        assert_eq!(truncate_graphemes(text, 3), "ab");
        assert_eq!(truncate_graphemes(text, 4), "abe\u{301}");
        assert_eq!(truncate_graphemes("short", 10), "short");
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];

        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &c).unwrap().abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]).unwrap(), 0.0);
        assert!(cosine_similarity(&a, &[1.0, 0.0]).is_err());
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("ONNX".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Onnx);
        assert_eq!("stub".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Hashing);
        assert!("gpu".parse::<EmbeddingMode>().is_err());
    }

    #[test]
    fn config_validation() {
        assert!(EmbeddingConfig::default().validate().is_ok());
        let config = EmbeddingConfig {
            batch_size: 0,
            ..EmbeddingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn hashing_service_from_config() {
        let service = EmbeddingService::from_config(&EmbeddingConfig::default()).unwrap();
        assert_eq!(service.dimension(), 384);
        let vector = service.embed("fn parse_config()").await.unwrap();
        assert_eq!(vector.len(), 384);
    }
}

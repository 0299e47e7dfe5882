use crate::embeddings::{normalize, EmbeddingProvider};
use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use ndarray::{Array2, ArrayD, ArrayView1, ArrayView2, Axis, Ix2, Ix3};
use ort::execution_providers::{CPUExecutionProvider, ExecutionProvider};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tokio::sync::OnceCell;
use tokio::task::spawn_blocking;

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Sentence embeddings from an ONNX model with mean pooling.
///
/// Nothing is loaded until the first embed call; the session then lives as
/// long as the embedder.
pub struct OnnxEmbedder {
    model_id: String,
    model_dir: PathBuf,
    dimension: usize,
    max_length: usize,
    encoder: OnceCell<Arc<Encoder>>,
}

impl OnnxEmbedder {
    #[must_use]
    pub fn new(model_id: String, model_dir: PathBuf, dimension: usize, max_length: usize) -> Self {
        Self {
            model_id,
            model_dir,
            dimension,
            max_length,
            encoder: OnceCell::new(),
        }
    }

    async fn encoder(&self) -> Result<Arc<Encoder>> {
        let encoder = self
            .encoder
            .get_or_try_init(|| async {
                let dir = self.model_dir.clone();
                let max_length = self.max_length;
                log::info!("Loading ONNX model from {}", dir.display());
                spawn_blocking(move || Encoder::load(&dir, max_length))
                    .await
                    .map_err(failed("model loader task"))?
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(encoder))
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let encoder = self.encoder().await?;
        let texts = texts.to_vec();
        let dimension = self.dimension;
        spawn_blocking(move || encoder.encode(texts, dimension))
            .await
            .map_err(failed("embedding task"))?
    }
}

fn failed<E: Display>(stage: &'static str) -> impl FnOnce(E) -> VectorStoreError {
    move |err| VectorStoreError::embedding(format!("{stage}: {err}"))
}

/// Loaded tokenizer plus ONNX session. `Session::run` needs `&mut`, hence the mutex.
struct Encoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
}

impl Encoder {
    fn load(dir: &Path, max_length: usize) -> Result<Self> {
        let model_path = dir.join(MODEL_FILE);
        let tokenizer_path = dir.join(TOKENIZER_FILE);
        for required in [&model_path, &tokenizer_path] {
            if !required.is_file() {
                return Err(VectorStoreError::embedding(format!(
                    "model file not found: {}",
                    required.display()
                )));
            }
        }

        // encode on the calling blocking thread, not rayon
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(failed("tokenizer"))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..TruncationParams::default()
            }))
            .map_err(failed("tokenizer truncation"))?;

        let session = Session::builder()
            .map_err(failed("session builder"))?
            .with_intra_threads(intra_threads())
            .map_err(failed("intra threads"))?
            .with_inter_threads(1)
            .map_err(failed("inter threads"))?
            .with_intra_op_spinning(false)
            .map_err(failed("intra spinning"))?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(failed("execution provider"))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(failed("optimization level"))?
            .commit_from_file(&model_path)
            .map_err(failed("model load"))?;
        log::debug!("ONNX session ready for {}", model_path.display());

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length,
        })
    }

    fn encode(&self, texts: Vec<String>, dimension: usize) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts, true)
            .map_err(failed("tokenization"))?;
        let batch = TokenBatch::new(&encodings, self.max_length)?;
        let output = self.forward(&batch)?;
        pool(output, batch.mask.view(), dimension)
    }

    fn forward(&self, batch: &TokenBatch) -> Result<ArrayD<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VectorStoreError::embedding("ONNX session lock poisoned"))?;

        let mut feed: HashMap<String, DynTensor> = HashMap::new();
        for input in &session.inputs {
            let values = match input.name.as_str() {
                "input_ids" => &batch.ids,
                "attention_mask" => &batch.mask,
                "token_type_ids" => &batch.type_ids,
                other => {
                    return Err(VectorStoreError::embedding(format!(
                        "model expects unsupported input '{other}'"
                    )))
                }
            };
            let tensor = Tensor::from_array(values.clone().into_dyn())
                .map_err(failed("input tensor"))?
                .upcast();
            feed.insert(input.name.clone(), tensor);
        }

        let outputs = session
            .run(SessionInputs::from(feed))
            .map_err(failed("ONNX forward"))?;
        if outputs.len() == 0 {
            return Err(VectorStoreError::embedding("ONNX model produced no outputs"));
        }
        let first = outputs[0]
            .try_extract_array::<f32>()
            .map_err(failed("ONNX output"))?;
        Ok(first.to_owned())
    }
}

fn intra_threads() -> usize {
    match std::thread::available_parallelism().map_or(1, |n| n.get()) {
        0..=4 => 1,
        5..=12 => 2,
        _ => 4,
    }
}

/// Padded `[rows, seq_len]` model inputs for one tokenizer batch.
struct TokenBatch {
    ids: Array2<i64>,
    mask: Array2<i64>,
    type_ids: Array2<i64>,
}

impl TokenBatch {
    fn new(encodings: &[Encoding], max_length: usize) -> Result<Self> {
        let seq_len = encodings.first().map_or(0, Encoding::len);
        if seq_len > max_length {
            return Err(VectorStoreError::embedding(format!(
                "tokenized length {seq_len} exceeds max_length {max_length}"
            )));
        }
        if encodings.iter().any(|encoding| encoding.len() != seq_len) {
            return Err(VectorStoreError::embedding(
                "tokenizer padding produced ragged rows",
            ));
        }

        let shape = (encodings.len(), seq_len);
        Ok(Self {
            ids: column(encodings, shape, Encoding::get_ids),
            mask: column(encodings, shape, Encoding::get_attention_mask),
            type_ids: column(encodings, shape, Encoding::get_type_ids),
        })
    }
}

fn column(
    encodings: &[Encoding],
    shape: (usize, usize),
    values: fn(&Encoding) -> &[u32],
) -> Array2<i64> {
    Array2::from_shape_fn(shape, |(row, col)| {
        values(&encodings[row]).get(col).map_or(0, |v| i64::from(*v))
    })
}

/// Turn model output into one unit vector per row. A `[rows, hidden]` output
/// is already pooled; `[rows, seq, hidden]` token states are mean-pooled
/// over the attention mask.
fn pool(
    output: ArrayD<f32>,
    mask: ArrayView2<'_, i64>,
    dimension: usize,
) -> Result<Vec<Vec<f32>>> {
    let shape = output.shape().to_vec();
    let rows: Vec<Vec<f32>> = match shape.len() {
        2 => output
            .into_dimensionality::<Ix2>()
            .map_err(failed("pooled output"))?
            .outer_iter()
            .map(|row| row.to_vec())
            .collect(),
        3 => {
            let states = output
                .into_dimensionality::<Ix3>()
                .map_err(failed("token output"))?;
            if mask.nrows() != states.len_of(Axis(0)) || mask.ncols() != states.len_of(Axis(1)) {
                return Err(VectorStoreError::embedding(format!(
                    "attention mask {:?} does not match output {shape:?}",
                    mask.shape()
                )));
            }
            states
                .outer_iter()
                .zip(mask.outer_iter())
                .map(|(tokens, row_mask)| {
                    masked_mean(tokens, row_mask.mapv(|m| m as f32).view())
                })
                .collect()
        }
        _ => {
            return Err(VectorStoreError::embedding(format!(
                "unexpected ONNX output shape {shape:?}"
            )))
        }
    };

    rows.into_iter()
        .map(|mut vector| {
            if vector.len() != dimension {
                return Err(VectorStoreError::dimension(dimension, vector.len()));
            }
            normalize(&mut vector);
            Ok(vector)
        })
        .collect()
}

fn masked_mean(tokens: ArrayView2<'_, f32>, weights: ArrayView1<'_, f32>) -> Vec<f32> {
    let count = weights.sum();
    let summed = (&tokens * &weights.insert_axis(Axis(1))).sum_axis(Axis(0));
    if count > 0.0 {
        (summed / count).to_vec()
    } else {
        summed.to_vec()
    }
}

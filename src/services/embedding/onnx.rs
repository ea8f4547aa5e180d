use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::Ix3;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};
use tracing::debug;

use super::Embedder;
use crate::error::{EmbeddingError, ModelError};
use crate::models::EmbeddingConfig;

/// Sentence-transformer exported to ONNX (`model.onnx` + `tokenizer.json`),
/// mean-pooled over the attention mask and L2-normalised.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_id: String,
    dimension: usize,
    batch_size: usize,
    uses_token_type_ids: bool,
}

impl OnnxEmbedder {
    pub fn load(config: &EmbeddingConfig) -> Result<Self, ModelError> {
        let model_dir = config.resolve_model_dir().ok_or_else(|| {
            ModelError::NotFound("could not determine models directory".to_string())
        })?;
        Self::load_from_dir(config, &model_dir)
    }

    pub fn load_from_dir(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, ModelError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let max_tokens = config.max_tokens as usize;

        if !model_path.exists() {
            return Err(ModelError::NotFound(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?;

        let uses_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        // Configure truncation to prevent OOM with long texts
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        debug!(
            model = %config.model_id,
            path = %model_path.display(),
            uses_token_type_ids,
            "embedding model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_id: config.model_id.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size.max(1) as usize,
            uses_token_type_ids,
        })
    }

    fn run_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for (j, ((&id, &m), &t)) in ids.iter().zip(mask.iter()).zip(types.iter()).enumerate() {
                input_ids[i * max_len + j] = id as i64;
                attention_mask[i * max_len + j] = m as i64;
                token_type_ids[i * max_len + j] = t as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, max_len], input_ids))
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(([batch_size, max_len], attention_mask.clone()))
                .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = if self.uses_token_type_ids {
            let token_type_tensor = Tensor::from_array(([batch_size, max_len], token_type_ids))
                .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
            session.run(ort::inputs![
                input_ids_tensor,
                attention_mask_tensor,
                token_type_tensor
            ])
        } else {
            session.run(ort::inputs![input_ids_tensor, attention_mask_tensor])
        }
        .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        match output_array.ndim() {
            // Token embeddings: [batch, seq, hidden]
            3 => {
                let hidden = output_array
                    .into_dimensionality::<Ix3>()
                    .map_err(|e| ModelError::InferenceError(e.to_string()))?;
                if hidden.shape()[2] != self.dimension {
                    return Err(ModelError::InferenceError(format!(
                        "model produced {} dimensions, config expects {}",
                        hidden.shape()[2],
                        self.dimension
                    )));
                }

                Ok((0..batch_size)
                    .map(|i| {
                        let mut pooled = vec![0f32; self.dimension];
                        let mut count = 0f32;
                        for j in 0..max_len {
                            if attention_mask[i * max_len + j] == 0 {
                                continue;
                            }
                            count += 1.0;
                            for (d, value) in pooled.iter_mut().enumerate() {
                                *value += hidden[[i, j, d]];
                            }
                        }
                        if count > 0.0 {
                            pooled.iter_mut().for_each(|v| *v /= count);
                        }
                        normalize(&pooled)
                    })
                    .collect())
            }
            // Already pooled: [batch, hidden]
            2 => Ok((0..batch_size)
                .map(|i| {
                    let embedding: Vec<f32> =
                        (0..self.dimension).map(|d| output_array[[i, d]]).collect();
                    normalize(&embedding)
                })
                .collect()),
            _ => Err(ModelError::InferenceError(format!(
                "unexpected output shape: {:?}",
                output_array.shape()
            ))),
        }
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(batch_size = batch.len(), "embedding batch");
            all_embeddings.extend(self.run_batch(batch)?);
        }
        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

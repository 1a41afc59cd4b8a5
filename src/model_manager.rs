use candle_core::Device;
use pylate_rs::ColBERT;

use crate::{
    embedding::{Embedder, EmbeddingMatrix},
    error::{Error, Result},
};

pub const DEFAULT_MODEL_ID: &str = "lightonai/GTE-ModernColBERT-v1";
pub const MODEL_ENV_VAR: &str = "FOLIO_MODEL";

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

/// ColBERT embedder with lazy model loading on first use.
pub struct ModelManager {
    model: Option<ColBERT>,
    model_id: String,
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    /// Creates a new `ModelManager`. The model ID is resolved from:
    /// 1. The `FOLIO_MODEL` environment variable, if set
    /// 2. Otherwise, the default model (`lightonai/GTE-ModernColBERT-v1`)
    ///
    /// Nothing is downloaded or loaded until the first encode call.
    pub fn new() -> Self {
        let model_id = std::env::var(MODEL_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());

        Self {
            model: None,
            model_id,
        }
    }

    /// Creates a `ModelManager` with an explicit model ID, bypassing
    /// environment variable resolution.
    pub fn with_model_id(model_id: String) -> Self {
        Self {
            model: None,
            model_id,
        }
    }

    /// Ensures the model is loaded, downloading from HuggingFace Hub if needed.
    fn ensure_loaded(&mut self) -> Result<&mut ColBERT> {
        if self.model.is_none() {
            tracing::info!(model = %self.model_id, "loading ColBERT model");
            let loaded: std::result::Result<ColBERT, _> =
                ColBERT::from(&self.model_id)
                    .with_device(default_device())
                    .try_into();
            let colbert = loaded.map_err(|e| {
                Error::Model(format!("failed to load {}: {e}", self.model_id))
            })?;
            self.model = Some(colbert);
        }

        self.model
            .as_mut()
            .ok_or_else(|| Error::Model("model not loaded".to_string()))
    }
}

impl Embedder for ModelManager {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed_documents(
        &mut self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingMatrix>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.ensure_loaded()?;
        let embeddings = model
            .encode(texts, false)
            .map_err(|e| Error::Model(e.to_string()))?;

        // embeddings shape: [batch_size, num_tokens, dimension]
        let (batch_size, _num_tokens, _dimension) = embeddings.dims3()?;
        if batch_size != texts.len() {
            return Err(Error::Model(format!(
                "encoded {batch_size} documents, expected {}",
                texts.len()
            )));
        }

        (0..batch_size)
            .map(|i| EmbeddingMatrix::from_tensor(&embeddings.get(i)?))
            .collect()
    }

    fn embed_query(&mut self, text: &str) -> Result<EmbeddingMatrix> {
        let model = self.ensure_loaded()?;
        let embeddings = model
            .encode(&[text.to_string()], true)
            .map_err(|e| Error::Model(e.to_string()))?;
        // Squeeze the batch dimension: [1, Q, D] -> [Q, D]
        EmbeddingMatrix::from_tensor(&embeddings.squeeze(0)?)
    }
}

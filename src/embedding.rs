use candle_core::{Device, Tensor};

use crate::error::{Error, Result};

/// Produces per-token embedding matrices for documents and queries.
///
/// Implementations may load their model lazily, which is why the methods
/// take `&mut self`.
pub trait Embedder: Send {
    /// Identifier of the model behind this embedder.
    fn model_id(&self) -> &str;

    /// Encode documents, one matrix per input text, in input order.
    fn embed_documents(
        &mut self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingMatrix>>;

    /// Encode a single query text.
    fn embed_query(&mut self, text: &str) -> Result<EmbeddingMatrix>;
}

/// A per-token embedding matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    pub num_tokens: u32,
    pub dimension: u32,
    /// Flat array of f32 values in row-major order: `data[token_idx * dimension + dim_idx]`.
    pub data: Vec<f32>,
}

impl EmbeddingMatrix {
    pub fn new(num_tokens: u32, dimension: u32, data: Vec<f32>) -> Result<Self> {
        if data.len() != (num_tokens as usize) * (dimension as usize) {
            return Err(Error::Model(format!(
                "embedding data length {} does not match {num_tokens} tokens x {dimension} dimensions",
                data.len()
            )));
        }
        Ok(Self {
            num_tokens,
            dimension,
            data,
        })
    }

    /// Convert a 2D tensor `[tokens, dimension]` into a matrix.
    pub fn from_tensor(tensor: &Tensor) -> Result<Self> {
        let (num_tokens, dimension) = tensor.dims2()?;
        let data = tensor.flatten_all()?.to_vec1::<f32>()?;
        Self::new(num_tokens as u32, dimension as u32, data)
    }

    /// Build a CPU tensor of shape `[num_tokens, dimension]`.
    pub fn to_tensor(&self) -> Result<Tensor> {
        Ok(Tensor::from_vec(
            self.data.clone(),
            (self.num_tokens as usize, self.dimension as usize),
            &Device::Cpu,
        )?)
    }
}

use candle_nn::Activation;
use serde::Deserialize;

/// Architecture of a [`crate::classifier::BinaryTextClassifier`], read from `config.json`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub vocab_size: usize,
    pub embedding_dim: usize,
    #[serde(default)]
    pub encoder: EncoderConfig,
    /// Widths of the dense layers between the encoder and the output unit.
    #[serde(default)]
    pub hidden_units: Vec<usize>,
    #[serde(default = "default_activation")]
    pub hidden_activation: Activation,
    /// Sequence length the model was trained with, when recorded.
    #[serde(default)]
    pub max_sequence_length: Option<usize>,
}

fn default_activation() -> Activation {
    Activation::Relu
}

/// How the embedded sequence is reduced to a single vector.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EncoderConfig {
    #[default]
    GlobalAveragePooling,
    GlobalMaxPooling,
    Lstm {
        units: usize,
    },
}

impl EncoderConfig {
    pub fn output_dim(&self, embedding_dim: usize) -> usize {
        match self {
            Self::GlobalAveragePooling | Self::GlobalMaxPooling => embedding_dim,
            Self::Lstm { units } => *units,
        }
    }
}

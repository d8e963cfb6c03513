pub use candle_core::Device;
use candle_core::{DType, Module, Tensor};
use candle_nn::rnn::{LSTMConfig, LSTM, RNN};
use candle_nn::{Activation, Embedding, Linear, VarBuilder};
use std::fs::File;
use std::path::Path;

use crate::error::{Cause, Error, Result};
use crate::model::{EncoderConfig, ModelConfig};

/// Binary classifier over fixed-width token id sequences.
pub trait SequenceClassifier {
    /// Returns one probability in `[0, 1]` per sequence, in input order.
    fn predict_proba(&self, sequences: &[Vec<u32>]) -> Result<Vec<f32>>;
}

impl<T: SequenceClassifier + ?Sized> SequenceClassifier for &T {
    fn predict_proba(&self, sequences: &[Vec<u32>]) -> Result<Vec<f32>> {
        (**self).predict_proba(sequences)
    }
}

#[derive(Clone, Debug)]
enum Encoder {
    GlobalAveragePooling,
    GlobalMaxPooling,
    Lstm(LSTM),
}

/// Embedding, sequence encoder, dense stack and a single sigmoid unit.
#[derive(Clone, Debug)]
pub struct BinaryTextClassifier {
    embedding: Embedding,
    encoder: Encoder,
    hidden: Vec<Linear>,
    activation: Activation,
    output: Linear,
    config: ModelConfig,
    device: Device,
}

impl BinaryTextClassifier {
    /// Reads the architecture from `config_path` and the weights from the
    /// safetensors file at `weights_path`. Both files are closed on return.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        config_path: P,
        weights_path: Q,
        device: Device,
    ) -> Result<Self> {
        let config_path = config_path.as_ref();
        let weights_path = weights_path.as_ref();

        let config_reader = open(config_path)?;
        let config: ModelConfig =
            serde_json::from_reader(config_reader).map_err(|e| Error::load(config_path, e))?;

        if let Err(e) = std::fs::metadata(weights_path) {
            return Err(match e.kind() {
                std::io::ErrorKind::NotFound => Error::ResourceNotFound {
                    path: weights_path.to_path_buf(),
                },
                _ => Error::load(weights_path, e),
            });
        }
        let tensors = candle_core::safetensors::load(weights_path, &device)
            .map_err(|e| Error::load(weights_path, e))?;
        let model_builder = VarBuilder::from_tensors(tensors, DType::F32, &device);

        Self::new(config, model_builder, device).map_err(|e| Error::load(weights_path, e))
    }

    pub fn new(config: ModelConfig, vb: VarBuilder, device: Device) -> candle_core::Result<Self> {
        let embedding =
            candle_nn::embedding(config.vocab_size, config.embedding_dim, vb.pp("embedding"))?;
        let encoder = match config.encoder {
            EncoderConfig::GlobalAveragePooling => Encoder::GlobalAveragePooling,
            EncoderConfig::GlobalMaxPooling => Encoder::GlobalMaxPooling,
            EncoderConfig::Lstm { units } => Encoder::Lstm(candle_nn::lstm(
                config.embedding_dim,
                units,
                LSTMConfig::default(),
                vb.pp("lstm"),
            )?),
        };

        let mut in_dim = config.encoder.output_dim(config.embedding_dim);
        let mut hidden = Vec::with_capacity(config.hidden_units.len());
        for (i, &units) in config.hidden_units.iter().enumerate() {
            hidden.push(candle_nn::linear(in_dim, units, vb.pp(format!("hidden.{i}")))?);
            in_dim = units;
        }
        let output = candle_nn::linear(in_dim, 1, vb.pp("output"))?;

        Ok(Self {
            embedding,
            encoder,
            hidden,
            activation: config.hidden_activation,
            output,
            config,
            device,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Maps `(batch, seq_len)` ids to `(batch, 1)` probabilities.
    pub fn forward(&self, input_ids: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.embedding.forward(input_ids)?;
        let mut xs = match &self.encoder {
            Encoder::GlobalAveragePooling => xs.mean(1)?,
            Encoder::GlobalMaxPooling => xs.max(1)?,
            Encoder::Lstm(lstm) => {
                let states = lstm.seq(&xs)?;
                match states.last() {
                    Some(state) => state.h().clone(),
                    None => candle_core::bail!("lstm encoder received an empty sequence"),
                }
            }
        };
        for layer in &self.hidden {
            xs = self.activation.forward(&layer.forward(&xs)?)?;
        }
        candle_nn::ops::sigmoid(&self.output.forward(&xs)?)
    }
}

impl SequenceClassifier for BinaryTextClassifier {
    fn predict_proba(&self, sequences: &[Vec<u32>]) -> Result<Vec<f32>> {
        if sequences.is_empty() {
            return Ok(Vec::new());
        }
        let vocab_size = self.config.vocab_size;
        if let Some(id) = sequences.iter().flatten().find(|&&id| id as usize >= vocab_size) {
            return Err(Error::Inference(Cause::Invalid(format!(
                "token id {} outside vocabulary of size {}",
                id, vocab_size
            ))));
        }

        let mut input_ids = Vec::with_capacity(sequences.len());
        for ids in sequences {
            input_ids.push(Tensor::new(ids.as_slice(), &self.device).map_err(Error::inference)?);
        }
        let xs = Tensor::stack(input_ids.as_slice(), 0)
            .and_then(|input| self.forward(&input))
            .and_then(|probs| probs.flatten_all())
            .and_then(|probs| probs.to_vec1::<f32>())
            .map_err(Error::inference)?;
        Ok(xs)
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::ResourceNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::load(path, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tensors(entries: &[(&str, Vec<f32>, Vec<usize>)]) -> HashMap<String, Tensor> {
        entries
            .iter()
            .map(|(name, data, shape)| {
                let tensor = Tensor::from_vec(data.clone(), shape.as_slice(), &Device::Cpu).unwrap();
                (name.to_string(), tensor)
            })
            .collect()
    }

    // Vocabulary of 4, embedding dim 1: id 3 embeds to 4.0, everything else to 0.0.
    fn pooling_model(encoder: EncoderConfig) -> BinaryTextClassifier {
        let config = ModelConfig {
            vocab_size: 4,
            embedding_dim: 1,
            encoder,
            hidden_units: Vec::new(),
            hidden_activation: Activation::Relu,
            max_sequence_length: Some(4),
        };
        let weights = tensors(&[
            ("embedding.weight", vec![0.0, 0.0, 0.0, 4.0], vec![4, 1]),
            ("output.weight", vec![1.0], vec![1, 1]),
            ("output.bias", vec![0.0], vec![1]),
        ]);
        let vb = VarBuilder::from_tensors(weights, DType::F32, &Device::Cpu);
        BinaryTextClassifier::new(config, vb, Device::Cpu).unwrap()
    }

    #[test]
    fn average_pooling_probabilities() {
        let model = pooling_model(EncoderConfig::GlobalAveragePooling);
        let probs = model
            .predict_proba(&[vec![3, 0, 0, 0], vec![0, 0, 0, 0]])
            .unwrap();
        assert_eq!(probs.len(), 2);
        // sigmoid(1.0) and sigmoid(0.0)
        assert!((probs[0] - 0.731_058_6).abs() < 1e-5);
        assert!((probs[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn max_pooling_probabilities() {
        let model = pooling_model(EncoderConfig::GlobalMaxPooling);
        let probs = model.predict_proba(&[vec![1, 3, 2, 0]]).unwrap();
        // sigmoid(4.0)
        assert!((probs[0] - 0.982_013_8).abs() < 1e-5);
    }

    #[test]
    fn out_of_vocabulary_id_is_an_inference_error() {
        let model = pooling_model(EncoderConfig::GlobalAveragePooling);
        let err = model.predict_proba(&[vec![9, 0, 0, 0]]).unwrap_err();
        assert!(matches!(err, Error::Inference(Cause::Invalid(_))));
    }

    #[test]
    fn ragged_batch_is_an_inference_error() {
        let model = pooling_model(EncoderConfig::GlobalAveragePooling);
        let err = model.predict_proba(&[vec![1, 2], vec![1]]).unwrap_err();
        assert!(matches!(err, Error::Inference(Cause::CandleError(_))));
    }

    #[test]
    fn lstm_encoder_with_hidden_layer_produces_probabilities() {
        let config = ModelConfig {
            vocab_size: 3,
            embedding_dim: 2,
            encoder: EncoderConfig::Lstm { units: 2 },
            hidden_units: vec![3],
            hidden_activation: Activation::Relu,
            max_sequence_length: None,
        };
        let gates = 4 * 2;
        let weights = tensors(&[
            ("embedding.weight", vec![0.0, 0.0, 0.5, -0.5, 1.0, 1.0], vec![3, 2]),
            ("lstm.weight_ih_l0", vec![0.1; gates * 2], vec![gates, 2]),
            ("lstm.weight_hh_l0", vec![0.1; gates * 2], vec![gates, 2]),
            ("lstm.bias_ih_l0", vec![0.0; gates], vec![gates]),
            ("lstm.bias_hh_l0", vec![0.0; gates], vec![gates]),
            ("hidden.0.weight", vec![1.0; 6], vec![3, 2]),
            ("hidden.0.bias", vec![0.0; 3], vec![3]),
            ("output.weight", vec![1.0; 3], vec![1, 3]),
            ("output.bias", vec![0.0], vec![1]),
        ]);
        let vb = VarBuilder::from_tensors(weights, DType::F32, &Device::Cpu);
        let model = BinaryTextClassifier::new(config, vb, Device::Cpu).unwrap();

        let probs = model
            .predict_proba(&[vec![1, 2, 0], vec![2, 2, 2]])
            .unwrap();
        assert_eq!(probs.len(), 2);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn missing_config_is_not_found() {
        let err = BinaryTextClassifier::load(
            "/definitely/not/here/config.json",
            "/definitely/not/here/model.safetensors",
            Device::Cpu,
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }
}

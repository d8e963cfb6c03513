use serde::{Deserialize, Serialize};

use crate::classifier::{BinaryTextClassifier, SequenceClassifier};
use crate::config::Settings;
use crate::error::{Cause, Error, Result};
use crate::loader;
use crate::tokenizer::TextTokenizer;

/// Probabilities at or above this value are labelled `1`.
pub const THRESHOLD: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: u8,
    pub probability: f32,
}

impl Prediction {
    pub fn from_probability(probability: f32) -> Self {
        Self {
            label: u8::from(probability >= THRESHOLD),
            probability,
        }
    }
}

impl From<Prediction> for (u8, f32) {
    fn from(prediction: Prediction) -> Self {
        (prediction.label, prediction.probability)
    }
}

/// Classifies a single text.
pub fn predict<M>(text: &str, model: &M, tokenizer: &TextTokenizer) -> Result<Prediction>
where
    M: SequenceClassifier + ?Sized,
{
    run(&[text], model, tokenizer)
        .and_then(|mut predictions| {
            predictions.pop().ok_or_else(|| {
                Error::Inference(Cause::Invalid("model returned no prediction".to_string()))
            })
        })
        .map_err(|e| {
            tracing::error!("error in prediction: {e}");
            e
        })
}

/// Classifies `texts` with one batched inference call; output order matches input order.
///
/// An empty batch returns an empty result without touching the model.
pub fn predict_batch<M, S>(texts: &[S], model: &M, tokenizer: &TextTokenizer) -> Result<Vec<Prediction>>
where
    M: SequenceClassifier + ?Sized,
    S: AsRef<str>,
{
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    run(texts, model, tokenizer).map_err(|e| {
        tracing::error!("error in batch prediction: {e}");
        e
    })
}

fn run<M, S>(texts: &[S], model: &M, tokenizer: &TextTokenizer) -> Result<Vec<Prediction>>
where
    M: SequenceClassifier + ?Sized,
    S: AsRef<str>,
{
    let sequences = tokenizer.encode_padded(texts)?;
    let probabilities = model.predict_proba(&sequences)?;
    if probabilities.len() != sequences.len() {
        return Err(Error::Inference(Cause::Invalid(format!(
            "model returned {} probabilities for {} inputs",
            probabilities.len(),
            sequences.len()
        ))));
    }
    probabilities
        .into_iter()
        .map(|p| {
            if p.is_finite() && (0.0..=1.0).contains(&p) {
                Ok(Prediction::from_probability(p))
            } else {
                Err(Error::Inference(Cause::Invalid(format!(
                    "model returned probability {p} outside [0, 1]"
                ))))
            }
        })
        .collect()
}

/// Model and tokenizer loaded once and shared by every prediction call.
#[derive(Clone)]
pub struct ClassificationPipeline<M: SequenceClassifier = BinaryTextClassifier> {
    model: M,
    tokenizer: TextTokenizer,
}

impl ClassificationPipeline<BinaryTextClassifier> {
    pub fn load(settings: &Settings) -> Result<Self> {
        let (model, tokenizer) = loader::load(settings)?;
        Ok(Self::new(model, tokenizer))
    }
}

impl<M: SequenceClassifier> ClassificationPipeline<M> {
    pub fn new(model: M, tokenizer: TextTokenizer) -> Self {
        Self { model, tokenizer }
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        predict(text, &self.model, &self.tokenizer)
    }

    pub fn predict_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Prediction>> {
        predict_batch(texts, &self.model, &self.tokenizer)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn tokenizer(&self) -> &TextTokenizer {
        &self.tokenizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(Prediction::from_probability(0.5).label, 1);
        assert_eq!(Prediction::from_probability(0.499_999).label, 0);
        assert_eq!(Prediction::from_probability(1.0).label, 1);
        assert_eq!(Prediction::from_probability(0.0).label, 0);
    }

    #[test]
    fn converts_into_pair() {
        let pair: (u8, f32) = Prediction::from_probability(0.9).into();
        assert_eq!(pair, (1, 0.9));
    }

    #[test]
    fn serializes_as_json_object() {
        let json = serde_json::to_string(&Prediction::from_probability(0.25)).unwrap();
        assert_eq!(json, r#"{"label":0,"probability":0.25}"#);
    }
}

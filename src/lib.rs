//! Binary text classification over a pretrained candle model and a word-level tokenizer.
//!
//! [`ClassificationPipeline::load`] reads everything named by [`Settings`] once;
//! [`predict`] and [`predict_batch`] then tokenize, pad to the configured
//! sequence length, run the model and threshold the probability at 0.5.

pub mod classifier;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod model;
pub mod predictor;
pub mod tokenizer;

pub use classifier::{BinaryTextClassifier, Device, SequenceClassifier};
pub use config::Settings;
pub use error::{Cause, Error, Result};
pub use loader::load;
pub use predictor::{predict, predict_batch, ClassificationPipeline, Prediction};
pub use tokenizer::{pad_sequence, TextTokenizer};

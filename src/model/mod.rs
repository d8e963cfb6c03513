pub mod config;

pub use config::{EncoderConfig, ModelConfig};

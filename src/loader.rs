use crate::classifier::{BinaryTextClassifier, Device};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::tokenizer::TextTokenizer;

/// Loads the classifier and tokenizer named by `settings`.
///
/// Meant to run once at startup. A missing file yields
/// [`Error::ResourceNotFound`]; any other failure yields [`Error::Load`].
pub fn load(settings: &Settings) -> Result<(BinaryTextClassifier, TextTokenizer)> {
    load_inner(settings).map_err(|e| {
        match &e {
            Error::ResourceNotFound { path } => {
                tracing::error!(path = %path.display(), "model or tokenizer file not found: {e}")
            }
            _ => tracing::error!("error loading model or tokenizer: {e}"),
        }
        e
    })
}

fn load_inner(settings: &Settings) -> Result<(BinaryTextClassifier, TextTokenizer)> {
    tracing::info!("Loading model from: {}", settings.model_path.display());
    let model = BinaryTextClassifier::load(
        &settings.model_config_path,
        &settings.model_path,
        Device::Cpu,
    )?;
    if let Some(trained) = model.config().max_sequence_length {
        if trained != settings.max_sequence_length {
            tracing::warn!(
                trained,
                configured = settings.max_sequence_length,
                "MAX_SEQUENCE_LENGTH differs from the length the model was trained with"
            );
        }
    }

    tracing::info!("Loading tokenizer from: {}", settings.tokenizer_path.display());
    let tokenizer = TextTokenizer::from_file(&settings.tokenizer_path, settings.max_sequence_length)?;

    tracing::info!("Model and tokenizer loaded successfully");
    Ok((model, tokenizer))
}

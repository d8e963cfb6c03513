use crate::error::{Cause, Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tokenizers::Tokenizer;

/// Id used for right padding.
pub const PAD_ID: u32 = 0;

/// Punctuation removed by a Keras tokenizer unless configured otherwise.
pub const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

// Stands in for unknown words when the vocabulary has no OOV entry; mapped to
// PAD_ID and removed after encoding.
const DROPPED_TOKEN: &str = "\u{0}";

/// Text to fixed-width id sequences, backed by a `tokenizers::Tokenizer`.
#[derive(Clone, Debug)]
pub struct TextTokenizer {
    tokenizer: Tokenizer,
    policy: VocabularyPolicy,
    add_special_tokens: bool,
    sequence_length: usize,
}

impl TextTokenizer {
    pub fn from_file<P: AsRef<Path>>(path: P, sequence_length: usize) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ResourceNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::load(path, e),
        })?;
        Self::from_json(&contents, sequence_length).map_err(|cause| Error::load(path, cause))
    }

    /// Accepts either a Keras `Tokenizer.to_json()` document or a Hugging Face `tokenizer.json`.
    pub fn from_json(contents: &str, sequence_length: usize) -> std::result::Result<Self, Cause> {
        let document: Value = serde_json::from_str(contents)?;
        if is_keras_document(&document) {
            let document: KerasDocument = serde_json::from_value(document)?;
            let (tokenizer, policy) = document.config.into_pipeline()?;
            return Ok(Self {
                tokenizer,
                policy,
                add_special_tokens: false,
                sequence_length,
            });
        }

        let mut tokenizer = Tokenizer::from_str(contents)?;
        tokenizer.with_padding(None).with_truncation(None)?;
        Ok(Self {
            tokenizer,
            policy: VocabularyPolicy::default(),
            add_special_tokens: true,
            sequence_length,
        })
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Unpadded id sequences, one per text.
    pub fn texts_to_sequences<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Vec<u32>>> {
        let inputs: Vec<&str> = texts.iter().map(AsRef::as_ref).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, self.add_special_tokens)
            .map_err(Error::inference)?;
        Ok(encodings
            .iter()
            .map(|encoding| self.policy.apply(encoding.get_ids()))
            .collect())
    }

    /// Id sequences padded or truncated to exactly [`Self::sequence_length`].
    pub fn encode_padded<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Vec<u32>>> {
        Ok(self
            .texts_to_sequences(texts)?
            .into_iter()
            .map(|ids| pad_sequence(ids, self.sequence_length))
            .collect())
    }
}

/// Right-pads with [`PAD_ID`] or drops trailing ids so the result has exactly `length` ids.
pub fn pad_sequence(mut ids: Vec<u32>, length: usize) -> Vec<u32> {
    ids.truncate(length);
    ids.resize(length, PAD_ID);
    ids
}

/// Keras id rules applied after the word-level lookup.
#[derive(Debug, Clone, Default, PartialEq)]
struct VocabularyPolicy {
    dropped_id: Option<u32>,
    num_words: Option<u32>,
    oov_id: Option<u32>,
}

impl VocabularyPolicy {
    fn apply(&self, ids: &[u32]) -> Vec<u32> {
        ids.iter()
            .filter_map(|&id| {
                if self.dropped_id == Some(id) {
                    return None;
                }
                match self.num_words {
                    Some(limit) if id >= limit => self.oov_id,
                    _ => Some(id),
                }
            })
            .collect()
    }
}

fn is_keras_document(document: &Value) -> bool {
    document.get("class_name").and_then(Value::as_str) == Some("Tokenizer")
        || document
            .get("config")
            .map_or(false, |config| config.get("word_index").is_some())
}

#[derive(Debug, Deserialize)]
struct KerasDocument {
    config: KerasConfig,
}

#[derive(Debug, Deserialize)]
struct KerasConfig {
    #[serde(default)]
    num_words: Option<u32>,
    #[serde(default = "default_filters")]
    filters: Option<String>,
    #[serde(default = "default_lower")]
    lower: bool,
    #[serde(default = "default_split")]
    split: String,
    #[serde(default)]
    char_level: bool,
    #[serde(default)]
    oov_token: Option<String>,
    word_index: WordIndex,
}

fn default_filters() -> Option<String> {
    Some(DEFAULT_FILTERS.to_string())
}

fn default_lower() -> bool {
    true
}

fn default_split() -> String {
    " ".to_string()
}

/// Keras serializes `word_index` as a JSON string; plain objects are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WordIndex {
    Map(HashMap<String, u32>),
    Encoded(String),
}

impl WordIndex {
    fn into_map(self) -> std::result::Result<HashMap<String, u32>, Cause> {
        match self {
            Self::Map(map) => Ok(map),
            Self::Encoded(s) => Ok(serde_json::from_str(&s)?),
        }
    }
}

impl KerasConfig {
    fn into_pipeline(self) -> std::result::Result<(Tokenizer, VocabularyPolicy), Cause> {
        if self.char_level {
            return Err(Cause::Invalid(
                "character-level tokenizers are not supported".to_string(),
            ));
        }
        if self.split.is_empty() {
            return Err(Cause::Invalid("tokenizer split string is empty".to_string()));
        }

        let mut vocab = self.word_index.into_map()?;
        let oov_id = self
            .oov_token
            .as_ref()
            .and_then(|token| vocab.get(token).copied());
        let unk_token = match (&self.oov_token, oov_id) {
            (Some(token), Some(_)) => token.clone(),
            _ => {
                vocab.insert(DROPPED_TOKEN.to_string(), PAD_ID);
                DROPPED_TOKEN.to_string()
            }
        };
        let policy = VocabularyPolicy {
            dropped_id: oov_id.is_none().then_some(PAD_ID),
            num_words: self.num_words.filter(|&n| n > 0),
            oov_id,
        };

        let mut normalizers = Vec::new();
        if self.lower {
            normalizers.push(json!({ "type": "Lowercase" }));
        }
        let filters = self.filters.unwrap_or_default();
        if !filters.is_empty() {
            normalizers.push(json!({
                "type": "Replace",
                "pattern": { "Regex": character_class(&filters) },
                "content": self.split,
            }));
        }
        let normalizer = if normalizers.is_empty() {
            Value::Null
        } else {
            json!({ "type": "Sequence", "normalizers": normalizers })
        };

        let tokenizer_json = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": normalizer,
            "pre_tokenizer": {
                "type": "Split",
                "pattern": { "String": self.split },
                "behavior": "Removed",
                "invert": false
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": unk_token
            }
        });
        let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())?;
        Ok((tokenizer, policy))
    }
}

// Every filter character escaped as a hex code point, so no character can
// change the meaning of the class.
fn character_class(filters: &str) -> String {
    let mut class = String::from("[");
    for c in filters.chars() {
        class.push_str(&format!("\\x{{{:X}}}", c as u32));
    }
    class.push(']');
    class
}

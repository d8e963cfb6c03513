use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_APP_NAME: &str = "Text Classification API";
pub const DEFAULT_APP_VERSION: &str = "1.0.0";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 50;
pub const DEFAULT_MODEL_PATH: &str = "model/model.safetensors";
pub const DEFAULT_MODEL_CONFIG_PATH: &str = "model/config.json";
pub const DEFAULT_TOKENIZER_PATH: &str = "model/tokenizer.json";

/// Deployment parameters read once from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub debug: bool,
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Fixed width every token sequence is padded or truncated to.
    pub max_sequence_length: usize,
    pub base_dir: PathBuf,
    /// Safetensors weights of the classifier.
    pub model_path: PathBuf,
    /// JSON architecture description matching `model_path`.
    pub model_config_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, applying defaults for absent keys.
    ///
    /// Relative paths are resolved against `APP_BASE_DIR`, or the current
    /// directory when that is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_dir = match lookup("APP_BASE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let path = |key: &str, default: &str| resolve(&base_dir, &string(key, default));

        Ok(Self {
            app_name: string("APP_NAME", DEFAULT_APP_NAME),
            app_version: string("APP_VERSION", DEFAULT_APP_VERSION),
            debug: lookup("DEBUG").map(|v| parse_bool(&v)).unwrap_or(false),
            log_level: string("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            host: string("HOST", DEFAULT_HOST),
            port: integer(&lookup, "PORT", DEFAULT_PORT)?,
            workers: integer(&lookup, "WORKERS", DEFAULT_WORKERS)?,
            max_sequence_length: integer(
                &lookup,
                "MAX_SEQUENCE_LENGTH",
                DEFAULT_MAX_SEQUENCE_LENGTH,
            )?,
            model_path: path("MODEL_PATH", DEFAULT_MODEL_PATH),
            model_config_path: path("MODEL_CONFIG_PATH", DEFAULT_MODEL_CONFIG_PATH),
            tokenizer_path: path("TOKENIZER_PATH", DEFAULT_TOKENIZER_PATH),
            base_dir,
        })
    }
}

fn resolve(base_dir: &Path, value: &str) -> PathBuf {
    // Joining an absolute path replaces the base.
    base_dir.join(value)
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn integer<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| Error::Config {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[("APP_BASE_DIR", "/srv/app")]).unwrap();
        assert_eq!(s.app_name, "Text Classification API");
        assert_eq!(s.app_version, "1.0.0");
        assert!(!s.debug);
        assert_eq!(s.log_level, "INFO");
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 8000);
        assert_eq!(s.workers, 1);
        assert_eq!(s.max_sequence_length, 50);
        assert_eq!(s.model_path, PathBuf::from("/srv/app/model/model.safetensors"));
        assert_eq!(s.model_config_path, PathBuf::from("/srv/app/model/config.json"));
        assert_eq!(s.tokenizer_path, PathBuf::from("/srv/app/model/tokenizer.json"));
    }

    #[test]
    fn overrides_are_coerced() {
        let s = settings(&[
            ("APP_BASE_DIR", "/srv/app"),
            ("DEBUG", "TRUE"),
            ("PORT", " 9000 "),
            ("WORKERS", "4"),
            ("MAX_SEQUENCE_LENGTH", "120"),
            ("TOKENIZER_PATH", "/opt/tok.json"),
            ("MODEL_PATH", "weights/m.safetensors"),
        ])
        .unwrap();
        assert!(s.debug);
        assert_eq!(s.port, 9000);
        assert_eq!(s.workers, 4);
        assert_eq!(s.max_sequence_length, 120);
        assert_eq!(s.tokenizer_path, PathBuf::from("/opt/tok.json"));
        assert_eq!(s.model_path, PathBuf::from("/srv/app/weights/m.safetensors"));
    }

    #[test]
    fn only_true_enables_debug() {
        for value in ["False", "yes", "1", ""] {
            assert!(!settings(&[("DEBUG", value)]).unwrap().debug, "{value}");
        }
        assert!(settings(&[("DEBUG", "true")]).unwrap().debug);
    }

    #[test]
    fn bad_integer_is_a_config_error() {
        let err = settings(&[("PORT", "eighty")]).unwrap_err();
        match err {
            Error::Config { key, value, .. } => {
                assert_eq!(key, "PORT");
                assert_eq!(value, "eighty");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            settings(&[("MAX_SEQUENCE_LENGTH", "-1")]),
            Err(Error::Config { key: "MAX_SEQUENCE_LENGTH", .. })
        ));
    }
}

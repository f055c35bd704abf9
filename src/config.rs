//! Settings loaded from `SEALTOKEN_*` environment variables.
//!
//! | Variable               | Meaning                                 | Default |
//! |------------------------|-----------------------------------------|---------|
//! | `SEALTOKEN_SECRET_KEY` | 32-byte secret key, taken as raw bytes  | none    |
//! | `SEALTOKEN_LOG_LEVEL`  | tracing filter directive                | `warn`  |
//! | `SEALTOKEN_LOG_FORMAT` | `json` or `pretty`                      | `json`  |
//! | `SEALTOKEN_LOG_FILE`   | log file path                           | stderr  |

use crate::error::{ErrorCode, ErrorKind, Result, SealError};
use crate::key::SecretKey;
use crate::logging::{LogFormat, LogOutput, LoggerConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

const ENV_PREFIX: &str = "SEALTOKEN";

#[derive(Deserialize)]
struct RawSettings {
    secret_key: Option<String>,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_format: LogFormat,
    log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Clone)]
pub struct Settings {
    /// Raw `SEALTOKEN_SECRET_KEY` value, checked only when the key is used.
    secret_key: Option<Zeroizing<String>>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("secret_key", &self.secret_key.as_ref().map(|_| ".."))
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Loads settings from an explicit variable map instead of the process
    /// environment. Keys are full variable names, e.g. `SEALTOKEN_LOG_LEVEL`.
    pub fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        let vars: config::Map<String, String> = vars.into_iter().collect();
        Self::load(config::Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn load(source: config::Environment) -> Result<Self> {
        let raw: RawSettings = config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| {
                SealError::with_kind_and_source(
                    ErrorCode::BadRequest,
                    ErrorKind::Config,
                    "invalid settings",
                    e,
                )
            })?;

        Ok(Self {
            secret_key: raw.secret_key.map(Zeroizing::new),
            log_level: raw.log_level,
            log_format: raw.log_format,
            log_file: raw.log_file,
        })
    }

    /// The configured secret key, or `None` when the variable is unset.
    ///
    /// Fails if the variable is set but is not exactly 32 bytes long.
    pub fn secret_key(&self) -> Result<Option<SecretKey>> {
        self.secret_key
            .as_ref()
            .map(|key| SecretKey::new(key.as_bytes()))
            .transpose()
            .map_err(|e| e.with_context(format!("invalid {ENV_PREFIX}_SECRET_KEY")))
    }

    pub fn logger_config(&self) -> LoggerConfig {
        let output = match &self.log_file {
            Some(path) => LogOutput::File(path.clone()),
            None => LogOutput::Stderr,
        };
        LoggerConfig::new()
            .with_level(self.log_level.clone())
            .with_format(self.log_format)
            .with_output(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_map(HashMap::new()).unwrap();
        assert!(settings.secret_key().unwrap().is_none());
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.log_format, LogFormat::Json);
        assert!(settings.log_file.is_none());
        assert_eq!(settings.logger_config().output(), &LogOutput::Stderr);
    }

    #[test]
    fn test_all_values() {
        let settings = Settings::from_map(vars(&[
            ("SEALTOKEN_SECRET_KEY", "39b04101cac8b8f8c24f4780fd5f1950"),
            ("SEALTOKEN_LOG_LEVEL", "debug"),
            ("SEALTOKEN_LOG_FORMAT", "pretty"),
            ("SEALTOKEN_LOG_FILE", "/tmp/sealtoken.log"),
        ]))
        .unwrap();

        let key = settings.secret_key().unwrap().unwrap();
        assert_eq!(key.as_bytes(), b"39b04101cac8b8f8c24f4780fd5f1950");
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_format, LogFormat::Pretty);

        let logger = settings.logger_config();
        assert_eq!(logger.level(), "debug");
        assert_eq!(logger.format(), LogFormat::Pretty);
        assert_eq!(
            logger.output(),
            &LogOutput::File(PathBuf::from("/tmp/sealtoken.log"))
        );
    }

    #[test]
    fn test_unrelated_variables_ignored() {
        let settings = Settings::from_map(vars(&[
            ("OTHER_SECRET_KEY", "not ours"),
            ("SEALTOKENX_LOG_LEVEL", "trace"),
        ]))
        .unwrap();
        assert!(settings.secret_key().unwrap().is_none());
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn test_short_secret_key_rejected_on_use() {
        let settings = Settings::from_map(vars(&[
            ("SEALTOKEN_SECRET_KEY", "shortkey"),
            ("SEALTOKEN_LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(settings.log_level, "debug");

        let err = settings.secret_key().expect_err("expected key length error");
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.kind, Some(ErrorKind::InvalidKeyLength));
        assert!(err.to_string().contains("secret key must be 32 bytes long"));
        assert!(err.to_string().starts_with("invalid SEALTOKEN_SECRET_KEY"));
    }

    #[test]
    fn test_debug_redacts_secret_key() {
        let settings = Settings::from_map(vars(&[(
            "SEALTOKEN_SECRET_KEY",
            "39b04101cac8b8f8c24f4780fd5f1950",
        )]))
        .unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("39b04101"));
        assert!(debug.contains("secret_key: Some(\"..\")"));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let err = Settings::from_map(vars(&[("SEALTOKEN_LOG_FORMAT", "xml")]))
            .expect_err("expected format error");
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.kind, Some(ErrorKind::Config));
    }
}

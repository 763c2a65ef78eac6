use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use basket_ocr::RecognizerConfig;
use tracing::{info, warn};

/// Server settings, read once at startup from `BASKET_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Maximum request body in bytes; receipt photos arrive base64-encoded.
    pub body_limit: usize,
    pub ocr_lang: String,
    pub tessdata: Option<String>,
    /// Optional TOML file extending the parser's keyword tables.
    pub vocabulary_path: Option<PathBuf>,
    /// Origin allowed to call the API cross-site. Same-origin only when unset.
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: try_load(&lookup, "BASKET_HOST", "127.0.0.1".to_string()),
            port: try_load(&lookup, "BASKET_PORT", 3000),
            db_path: optional(&lookup, "BASKET_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("basket.db")),
            body_limit: try_load(&lookup, "BASKET_BODY_LIMIT", 10 * 1024 * 1024),
            ocr_lang: try_load(&lookup, "BASKET_OCR_LANG", "eng".to_string()),
            tessdata: optional(&lookup, "TESSDATA_PREFIX"),
            vocabulary_path: optional(&lookup, "BASKET_VOCABULARY").map(PathBuf::from),
            cors_origin: optional(&lookup, "BASKET_CORS_ORIGIN"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn recognizer_config(&self) -> RecognizerConfig {
        RecognizerConfig {
            data_path: self.tessdata.clone(),
            lang: self.ocr_lang.clone(),
            ..RecognizerConfig::default()
        }
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(lookup, key) {
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}; using default: {default}");
            default
        }),
    }
}

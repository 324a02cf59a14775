use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_MODEL_PATH: &str = "model/tea_disease.onnx";
const DEFAULT_LABELS_PATH: &str = "model/tea_diseases.csv";

/// Startup configuration. One deployable binary covers both observed
/// deployments: the CORS origin and the route prefix are the only things
/// that differed between them.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
    pub route_prefix: String,
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT must be a valid port number, got `{raw}`")))?,
            Err(_) => DEFAULT_PORT,
        };

        let route_prefix = normalize_prefix(
            &env::var("ROUTE_PREFIX").unwrap_or_default(),
        )?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port,
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| DEFAULT_ORIGIN.to_string()),
            route_prefix,
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH)),
            labels_path: env::var("LABELS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LABELS_PATH)),
        })
    }
}

/// A prefix is either empty or `/segment`-shaped; a trailing slash would
/// produce routes like `//test`, so it is rejected.
fn normalize_prefix(raw: &str) -> Result<String> {
    let prefix = raw.trim();
    if prefix.is_empty() {
        return Ok(String::new());
    }
    if !prefix.starts_with('/') || prefix.ends_with('/') {
        return Err(Error::Config(format!(
            "ROUTE_PREFIX must be empty or start with `/` and not end with one, got `{prefix}`"
        )));
    }
    Ok(prefix.to_string())
}

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;

/// Value shipped in the example `.env`; treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Full application configuration, read from the environment with a `.env`
/// file in the working directory as fallback.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Per-request timeout for the model call (0 = no limit).
    pub gemini_timeout_s: u64,

    // Ingestion
    pub ocr_bin: String,
    pub ocr_lang: String,
    pub max_upload_bytes: usize,

    // Web
    pub web_bind: String,
    pub web_port: u16,
    pub web_dist_dir: String,
}

/// True when `key` is usable as a Gemini credential: non-empty and not the
/// example placeholder. Compared as given; loading trims surrounding
/// whitespace.
pub fn validate_api_key(key: &str) -> bool {
    !key.is_empty() && key != PLACEHOLDER_API_KEY
}

fn parse_dotenv_str(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(v);
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

fn parse_dotenv(path: &Path) -> HashMap<String, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_dotenv_str(&contents),
        Err(_) => HashMap::new(),
    }
}

fn get(key: &str, dotenv: &HashMap<String, String>) -> Option<String> {
    std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
}

fn get_str(key: &str, dotenv: &HashMap<String, String>, default: &str) -> String {
    get(key, dotenv).unwrap_or_else(|| default.to_string())
}

fn get_u64(key: &str, dotenv: &HashMap<String, String>, default: u64) -> u64 {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_usize(key: &str, dotenv: &HashMap<String, String>, default: usize) -> usize {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_u16(key: &str, dotenv: &HashMap<String, String>, default: u16) -> u16 {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(Path::new(".env"))
    }

    /// Like [`Config::from_env`] but reads the fallback file from `dotenv_path`.
    pub fn from_env_with(dotenv_path: &Path) -> Result<Self> {
        let dotenv = parse_dotenv(dotenv_path);
        Ok(Self::from_map(&dotenv))
    }

    fn from_map(dotenv: &HashMap<String, String>) -> Self {
        // Older .env files written for the browser build use the Vite name.
        let gemini_api_key = get("GEMINI_API_KEY", dotenv)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| get("VITE_GEMINI_API_KEY", dotenv).map(|s| s.trim().to_string()))
            .unwrap_or_default();

        Config {
            gemini_api_key,
            gemini_model: get_str("GEMINI_MODEL", dotenv, DEFAULT_MODEL),
            gemini_base_url: get_str("GEMINI_BASE_URL", dotenv, DEFAULT_BASE_URL),
            gemini_timeout_s: get_u64("GEMINI_TIMEOUT_S", dotenv, 0),
            ocr_bin: get_str("OCR_BIN", dotenv, "tesseract"),
            ocr_lang: get_str("OCR_LANG", dotenv, "eng"),
            max_upload_bytes: get_usize("MAX_UPLOAD_BYTES", dotenv, 20 * 1024 * 1024),
            web_bind: get_str("WEB_BIND", dotenv, "127.0.0.1"),
            web_port: get_u16("WEB_PORT", dotenv, 3131),
            web_dist_dir: get_str("WEB_DIST_DIR", dotenv, "web"),
        }
    }

    pub fn api_key_valid(&self) -> bool {
        validate_api_key(&self.gemini_api_key)
    }
}

/// Steps shown on the setup screen when no usable key is configured.
pub fn setup_instructions() -> Vec<String> {
    vec![
        "Visit Google AI Studio (https://aistudio.google.com/app/apikey) and sign in.".into(),
        "Create a new API key for the Gemini API.".into(),
        "Set GEMINI_API_KEY=<your key> in the environment or in the .env file next to the server."
            .into(),
        "Re-check the setup (or restart the server) to continue.".into(),
    ]
}

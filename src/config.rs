//! Env-driven configuration for the service and the CLI.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Everything except the API key has a development default.
//! A missing key is not a load failure: it is reported at startup and turns
//! generation off.
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub model: String,
    pub output_dir: String,
    pub api_host: String,
    pub api_port: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> Result<Self, env::VarError> {
        Ok(Config {
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            output_dir: env::var("OUTPUT_DIR").unwrap_or_else(|_| "./stickers".to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: env::var("API_PORT").unwrap_or_else(|_| "8190".to_string()),
        })
    }

    pub fn print_env_vars() {
        let key = match env::var("GEMINI_API_KEY") {
            Ok(k) if !k.is_empty() => mask_secret(&k),
            _ => "<unset>".to_string(),
        };
        println!("GEMINI_API_KEY: {}", key);
        println!("GEMINI_BASE_URL: {}", env::var("GEMINI_BASE_URL").unwrap_or_else(|_| "<unset>".to_string()));
        println!("GEMINI_MODEL: {}", env::var("GEMINI_MODEL").unwrap_or_else(|_| "<unset>".to_string()));
        println!("OUTPUT_DIR: {}", env::var("OUTPUT_DIR").unwrap_or_else(|_| "<unset>".to_string()));
        println!("API_HOST: {}", env::var("API_HOST").unwrap_or_else(|_| "<unset>".to_string()));
        println!("API_PORT: {}", env::var("API_PORT").unwrap_or_else(|_| "<unset>".to_string()));
    }
}

/// Keep the last four characters, star out the rest.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

//! Runtime settings
//!
//! Loaded once at startup from an optional TOML file layered under the
//! process environment. Keys match the environment variable names in lower
//! case (`LLM_BASE_URL` -> `llm_base_url`).

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "cfd-intent.toml";
pub const DEFAULT_COMPLETIONS_PATH: &str = "/chat/completions";
pub const DEFAULT_LLM_TIMEOUT_SECS: f64 = 60.0;
pub const DEFAULT_SCHEMA_DIR: &str = "schemas/intent";
pub const DEFAULT_STORAGE_DIR: &str = "storage";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:8000,http://127.0.0.1:8000";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm_base_url: String,
    #[serde(default = "default_completions_path")]
    pub llm_completions_path: String,
    #[serde(default)]
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: String,
    #[serde(default = "default_timeout")]
    pub llm_timeout: f64,
    #[serde(default = "default_force_json")]
    pub llm_force_json: String,

    #[serde(default = "default_schema_dir")]
    pub cfd_schema_dir: PathBuf,
    #[serde(default = "default_storage_dir")]
    pub cfd_storage_dir: PathBuf,
    #[serde(default = "default_cors_origins")]
    pub cors_allow_origins: String,
    #[serde(default = "default_bind")]
    pub cfd_bind: String,

    // Per-vendor overrides consulted by the model-alias presets.
    pub deepseek_base_url: Option<String>,
    pub deepseek_completions_path: Option<String>,
    pub deepseek_chat_model: Option<String>,
    pub deepseek_reasoner_model: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_completions_path: Option<String>,
    pub openai_gpt4o_mini_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub ally_base_url: Option<String>,
    pub ally_completions_path: Option<String>,
    pub ally_model: Option<String>,
    pub ally_api_key: Option<String>,
}

impl Settings {
    /// Load settings from `file` (if it exists) and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let path = file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::default())
            .build()
            .context("failed to assemble configuration sources")?
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn llm_timeout(&self) -> Duration {
        if self.llm_timeout.is_finite() && self.llm_timeout > 0.0 {
            Duration::from_secs_f64(self.llm_timeout)
        } else {
            Duration::from_secs_f64(DEFAULT_LLM_TIMEOUT_SECS)
        }
    }

    pub fn force_json(&self) -> bool {
        self.llm_force_json.trim() == "1"
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allow_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_base_url: String::new(),
            llm_completions_path: default_completions_path(),
            llm_model: String::new(),
            llm_api_key: String::new(),
            llm_timeout: default_timeout(),
            llm_force_json: default_force_json(),
            cfd_schema_dir: default_schema_dir(),
            cfd_storage_dir: default_storage_dir(),
            cors_allow_origins: default_cors_origins(),
            cfd_bind: default_bind(),
            deepseek_base_url: None,
            deepseek_completions_path: None,
            deepseek_chat_model: None,
            deepseek_reasoner_model: None,
            deepseek_api_key: None,
            openai_base_url: None,
            openai_completions_path: None,
            openai_gpt4o_mini_model: None,
            openai_api_key: None,
            ally_base_url: None,
            ally_completions_path: None,
            ally_model: None,
            ally_api_key: None,
        }
    }
}

fn default_completions_path() -> String {
    DEFAULT_COMPLETIONS_PATH.to_string()
}

fn default_timeout() -> f64 {
    DEFAULT_LLM_TIMEOUT_SECS
}

fn default_force_json() -> String {
    "1".to_string()
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SCHEMA_DIR)
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_DIR)
}

fn default_cors_origins() -> String {
    DEFAULT_CORS_ORIGINS.to_string()
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

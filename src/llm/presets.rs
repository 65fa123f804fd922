//! Model-alias presets
//!
//! Each alias names a vendor endpoint. Vendor-specific settings win; any
//! that are unset fall back to the generic `LLM_*` values.

use std::time::Duration;

use crate::config::Settings;
use crate::error::LlmError;

pub const COLLECTOR_DEFAULT_ALIAS: &str = "deepseek-v1";
pub const REVIEWER_ALIAS: &str = "deepseek-reasoner";
pub const REVIEWER_FALLBACK_ALIAS: &str = "deepseek-r1";

/// One resolved generation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub alias: String,
    pub base_url: String,
    pub path: String,
    pub model: String,
    pub api_key: String,
    pub force_json: bool,
    pub supports_response_format: bool,
    pub timeout: Duration,
}

impl EndpointConfig {
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }

    /// Fail with [`LlmError::Configuration`] unless base URL, model and key are all set.
    pub fn ensure_complete(&self) -> Result<(), LlmError> {
        let missing: Vec<&str> = [
            ("base_url", &self.base_url),
            ("model", &self.model),
            ("api_key", &self.api_key),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LlmError::Configuration {
                missing: missing.join("/"),
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelPresets {
    generic: EndpointConfig,
    presets: Vec<EndpointConfig>,
}

impl ModelPresets {
    pub fn from_settings(settings: &Settings) -> Self {
        let generic = EndpointConfig {
            alias: "default".to_string(),
            base_url: settings.llm_base_url.clone(),
            path: settings.llm_completions_path.clone(),
            model: settings.llm_model.clone(),
            api_key: settings.llm_api_key.clone(),
            force_json: settings.force_json(),
            supports_response_format: true,
            timeout: settings.llm_timeout(),
        };

        let vendor = |alias: &str,
                      base_url: &Option<String>,
                      path: &Option<String>,
                      model: &Option<String>,
                      api_key: &Option<String>,
                      force_json: bool| EndpointConfig {
            alias: alias.to_string(),
            base_url: pick(base_url, &generic.base_url),
            path: pick(path, &generic.path),
            model: pick(model, &generic.model),
            api_key: pick(api_key, &generic.api_key),
            force_json,
            supports_response_format: true,
            timeout: generic.timeout,
        };

        let presets = vec![
            vendor(
                "deepseek-v1",
                &settings.deepseek_base_url,
                &settings.deepseek_completions_path,
                &settings.deepseek_chat_model,
                &settings.deepseek_api_key,
                true,
            ),
            // R1 answers better without a forced JSON response format.
            vendor(
                "deepseek-r1",
                &settings.deepseek_base_url,
                &settings.deepseek_completions_path,
                &settings.deepseek_reasoner_model,
                &settings.deepseek_api_key,
                false,
            ),
            vendor(
                "deepseek-reasoner",
                &settings.deepseek_base_url,
                &settings.deepseek_completions_path,
                &settings.deepseek_reasoner_model,
                &settings.deepseek_api_key,
                true,
            ),
            vendor(
                "gpt-4o-mini",
                &settings.openai_base_url,
                &settings.openai_completions_path,
                &settings.openai_gpt4o_mini_model,
                &settings.openai_api_key,
                true,
            ),
            vendor(
                "ally-x1",
                &settings.ally_base_url,
                &settings.ally_completions_path,
                &settings.ally_model,
                &settings.ally_api_key,
                true,
            ),
        ];

        Self { generic, presets }
    }

    pub fn preset(&self, alias: &str) -> Option<&EndpointConfig> {
        self.presets.iter().find(|preset| preset.alias == alias)
    }

    /// Collector endpoint: `deepseek-v1`, unless the caller asked for another
    /// known `deepseek*` alias.
    pub fn collector(&self, requested: Option<&str>) -> EndpointConfig {
        requested
            .filter(|alias| alias.starts_with("deepseek"))
            .and_then(|alias| self.preset(alias))
            .or_else(|| self.preset(COLLECTOR_DEFAULT_ALIAS))
            .unwrap_or(&self.generic)
            .clone()
    }

    /// Reviewer endpoint: `deepseek-reasoner`, then `deepseek-r1`.
    pub fn reviewer(&self) -> EndpointConfig {
        self.preset(REVIEWER_ALIAS)
            .or_else(|| self.preset(REVIEWER_FALLBACK_ALIAS))
            .unwrap_or(&self.generic)
            .clone()
    }

    /// Fast-fill endpoint: any known alias, else `deepseek-v1`.
    pub fn fast_fill(&self, requested: Option<&str>) -> EndpointConfig {
        requested
            .and_then(|alias| self.preset(alias))
            .or_else(|| self.preset(COLLECTOR_DEFAULT_ALIAS))
            .unwrap_or(&self.generic)
            .clone()
    }
}

fn pick(vendor: &Option<String>, fallback: &str) -> String {
    vendor
        .as_deref()
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            llm_base_url: "http://generic.test/v1/".into(),
            llm_model: "generic-model".into(),
            llm_api_key: "generic-key".into(),
            deepseek_base_url: Some("https://api.deepseek.test".into()),
            deepseek_chat_model: Some("deepseek-chat".into()),
            deepseek_reasoner_model: Some("deepseek-reasoner".into()),
            deepseek_api_key: Some(String::new()),
            ..Settings::default()
        }
    }

    #[test]
    fn vendor_values_fall_back_to_generic() {
        let presets = ModelPresets::from_settings(&settings());
        let chat = presets.preset("deepseek-v1").unwrap();
        assert_eq!(chat.url(), "https://api.deepseek.test/chat/completions");
        assert_eq!(chat.model, "deepseek-chat");
        // an empty vendor key is treated as unset
        assert_eq!(chat.api_key, "generic-key");

        let mini = presets.preset("gpt-4o-mini").unwrap();
        assert_eq!(mini.url(), "http://generic.test/v1/chat/completions");
        assert_eq!(mini.model, "generic-model");
    }

    #[test]
    fn r1_does_not_force_json() {
        let presets = ModelPresets::from_settings(&settings());
        assert!(!presets.preset("deepseek-r1").unwrap().force_json);
        assert!(presets.preset("deepseek-reasoner").unwrap().force_json);
    }

    #[test]
    fn collector_only_honours_deepseek_aliases() {
        let presets = ModelPresets::from_settings(&settings());
        assert_eq!(presets.collector(None).alias, "deepseek-v1");
        assert_eq!(presets.collector(Some("gpt-4o-mini")).alias, "deepseek-v1");
        assert_eq!(presets.collector(Some("deepseek-r1")).alias, "deepseek-r1");
        assert_eq!(presets.collector(Some("deepseek-unknown")).alias, "deepseek-v1");
    }

    #[test]
    fn fast_fill_accepts_any_known_alias() {
        let presets = ModelPresets::from_settings(&settings());
        assert_eq!(presets.fast_fill(Some("ally-x1")).alias, "ally-x1");
        assert_eq!(presets.fast_fill(Some("nope")).alias, "deepseek-v1");
        assert_eq!(presets.reviewer().alias, "deepseek-reasoner");
    }

    #[test]
    fn incomplete_endpoint_names_missing_fields() {
        let presets = ModelPresets::from_settings(&Settings::default());
        let err = presets.reviewer().ensure_complete().unwrap_err();
        assert_eq!(
            err.to_string(),
            "LLM configuration incomplete: missing base_url/model/api_key"
        );
    }
}

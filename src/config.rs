//! Configuration management for Task Master.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required for AI commands. Your OpenRouter API key.
//! - `OPENROUTER_API_BASE` - Optional. OpenAI-compatible endpoint. Defaults to OpenRouter.
//! - `OPENROUTER_MODEL` / `MODEL` - Optional. Model for generation requests.
//! - `RESEARCH_MODEL` - Optional. Model used when `--research` is given.
//! - `MAX_TOKENS` - Optional. Output token limit. Defaults to `4000`.
//! - `TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.7`.
//! - `DEBUG` - Optional. Log raw model output. Defaults to `false`.
//! - `DEFAULT_SUBTASKS` - Optional. Subtasks per expansion. Defaults to `3`.
//! - `PROJECT_NAME` - Optional. Project name for new documents.

use std::sync::Arc;

use thiserror::Error;

use crate::llm::{CompletionClient, OpenRouterClient};
use crate::util::parse_bool;

pub const DEFAULT_MODEL: &str = "anthropic/claude-3.7-sonnet";
pub const DEFAULT_RESEARCH_MODEL: &str = "perplexity/sonar-pro";
pub const DEFAULT_PROJECT_NAME: &str = "PRD Implementation";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Options threaded through every generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub research_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Log raw model output at debug level.
    pub debug: bool,
    pub default_subtasks: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            research_model: DEFAULT_RESEARCH_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.7,
            debug: false,
            default_subtasks: 3,
        }
    }
}

impl GenerationConfig {
    /// The model to use for a request.
    pub fn model_for(&self, use_research: bool) -> &str {
        if use_research {
            &self.research_model
        } else {
            &self.model
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key; only AI commands need it.
    pub api_key: Option<String>,

    /// Base URL of the completion endpoint.
    pub api_base: String,

    /// Name recorded in new documents and reports.
    pub project_name: String,

    pub generation: GenerationConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = GenerationConfig::default();

        let model = var("OPENROUTER_MODEL")
            .or_else(|| var("MODEL"))
            .unwrap_or(defaults.model);

        let research_model = var("RESEARCH_MODEL").unwrap_or(defaults.research_model);

        let max_tokens = parse_var(&var, "MAX_TOKENS", defaults.max_tokens)?;
        let temperature = parse_var(&var, "TEMPERATURE", defaults.temperature)?;
        let default_subtasks = parse_var(&var, "DEFAULT_SUBTASKS", defaults.default_subtasks)?;

        let debug = var("DEBUG").map(|v| parse_bool(&v)).unwrap_or(false);

        Ok(Self {
            api_key: var("OPENROUTER_API_KEY"),
            api_base: var("OPENROUTER_API_BASE")
                .unwrap_or_else(|| crate::llm::OPENROUTER_API_BASE.to_string()),
            project_name: var("PROJECT_NAME").unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            generation: GenerationConfig {
                model,
                research_model,
                max_tokens,
                temperature,
                debug,
                default_subtasks,
            },
        })
    }

    /// Build the completion client.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set.
    pub fn client(&self) -> Result<Arc<dyn CompletionClient>, ConfigError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;
        Ok(Arc::new(OpenRouterClient::with_base_url(
            api_key,
            self.api_base.clone(),
        )))
    }
}

fn parse_var<T>(var: impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        None => Ok(default),
    }
}

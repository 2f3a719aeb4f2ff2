//! Configuration management for sift.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - YAML config file (`--config`, `SIFT_CONFIG`, or `./sift.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Provider credentials never live in the file; the file names the
//! environment variable holding each key.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Config file looked up in the current directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "sift.yaml";

const KNOWN_LLM_PROVIDERS: [&str; 2] = ["ollama", "gemini"];
const KNOWN_SEARCH_PROVIDERS: [&str; 1] = ["tavily"];
const KNOWN_RANKING_STRATEGIES: [&str; 3] = ["lexical", "embedding", "none"];
const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "trigram"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file the values were read from, if any
    pub config_file: Option<PathBuf>,

    pub server: ServerConfig,

    pub search: SearchConfig,

    pub ranking: RankingConfig,

    pub llm: LlmSettings,

    /// Log filter override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// HTTP / WebSocket listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "127.0.0.1:8000"
    pub bind: String,

    /// Pause inserted before every message sent on a streaming session
    #[serde(rename = "pacingMs")]
    pub pacing_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            pacing_ms: 0,
        }
    }
}

/// Web-search provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: String,

    /// Provider base URL
    pub endpoint: String,

    /// Environment variable holding the provider API key
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: String,

    #[serde(rename = "maxResults")]
    pub max_results: u32,

    /// Provider search depth ("basic" or "advanced" for Tavily)
    #[serde(rename = "searchDepth")]
    pub search_depth: String,

    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "tavily".to_string(),
            endpoint: "https://api.tavily.com".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            max_results: 5,
            search_depth: "basic".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Source ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// "lexical", "embedding" or "none"
    pub strategy: String,

    /// Embedding backend for the "embedding" strategy ("ollama" or "trigram")
    #[serde(rename = "embeddingProvider")]
    pub embedding_provider: String,

    /// Embedding provider base URL
    pub endpoint: String,

    /// Embedding model identifier
    pub model: String,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            strategy: "lexical".to_string(),
            embedding_provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
        }
    }
}

/// Language-model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// "ollama" or "gemini"
    pub provider: String,

    /// Provider base URL; each provider has its own default
    pub endpoint: Option<String>,

    /// Model identifier; each provider has its own default
    pub model: Option<String>,

    /// Environment variable holding the provider API key
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: Option<String>,

    pub temperature: Option<f32>,

    #[serde(rename = "maxTokens")]
    pub max_tokens: Option<u32>,

    /// Replaces the built-in system prompt
    #[serde(rename = "systemPrompt")]
    pub system_prompt: Option<String>,

    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: None,
            model: None,
            api_key_env: None,
            temperature: Some(0.3),
            max_tokens: None,
            system_prompt: None,
            timeout_secs: 120,
        }
    }
}

impl LlmSettings {
    /// Configured model, falling back to the provider's default.
    pub fn model_name(&self) -> &str {
        match self.model.as_deref() {
            Some(model) => model,
            None if self.provider == "gemini" => "gemini-2.0-flash",
            None => "llama3.2",
        }
    }

    /// API key env var, falling back to the provider's conventional name.
    pub fn api_key_env_name(&self) -> Option<&str> {
        match self.api_key_env.as_deref() {
            Some(name) => Some(name),
            None if self.provider == "gemini" => Some("GEMINI_API_KEY"),
            None => None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    server: Option<ServerConfig>,
    search: Option<SearchConfig>,
    ranking: Option<RankingConfig>,
    llm: Option<LlmSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            ranking: RankingConfig::default(),
            llm: LlmSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `SIFT_CONFIG`: Path to config file (when `config_path` is `None`)
    /// - `SIFT_BIND`: Listen address
    /// - `SIFT_PACING_MS`: Delay before each streamed message
    /// - `SIFT_PROVIDER`: LLM provider
    /// - `SIFT_MODEL`: Model identifier
    /// - `SIFT_SEARCH_ENDPOINT`: Search provider base URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load(config_path: Option<&Path>) -> AppResult<Self> {
        let explicit = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("SIFT_CONFIG").ok().map(PathBuf::from));

        let config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Self::default().merge_yaml(&path)?
            }
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::default().merge_yaml(&fallback)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.config_file = Some(path.to_path_buf());

        if let Some(server) = config_file.server {
            result.server = server;
        }
        if let Some(search) = config_file.search {
            result.search = search;
        }
        if let Some(ranking) = config_file.ranking {
            result.ranking = ranking;
        }
        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env<F>(mut self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("SIFT_BIND") {
            self.server.bind = bind;
        }

        if let Some(pacing) = lookup("SIFT_PACING_MS") {
            self.server.pacing_ms = pacing.trim().parse().map_err(|_| {
                AppError::Config(format!("SIFT_PACING_MS must be an integer, got '{}'", pacing))
            })?;
        }

        if let Some(provider) = lookup("SIFT_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Some(model) = lookup("SIFT_MODEL") {
            self.llm.model = Some(model);
        }

        if let Some(endpoint) = lookup("SIFT_SEARCH_ENDPOINT") {
            self.search.endpoint = endpoint;
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }

        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(self)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over file and environment values.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        bind: Option<String>,
        pacing_ms: Option<u64>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(bind) = bind {
            self.server.bind = bind;
        }

        if let Some(pacing_ms) = pacing_ms {
            self.server.pacing_ms = pacing_ms;
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = Some(model);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Read an API key from the named environment variable.
    pub fn resolve_api_key(env_name: &str) -> AppResult<String> {
        std::env::var(env_name)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    env_name
                ))
            })
    }

    /// Validate provider names and numeric limits.
    pub fn validate(&self) -> AppResult<()> {
        check_known("LLM provider", &self.llm.provider, &KNOWN_LLM_PROVIDERS)?;
        check_known("search provider", &self.search.provider, &KNOWN_SEARCH_PROVIDERS)?;
        check_known(
            "ranking strategy",
            &self.ranking.strategy,
            &KNOWN_RANKING_STRATEGIES,
        )?;
        if self.ranking.strategy == "embedding" {
            check_known(
                "embedding provider",
                &self.ranking.embedding_provider,
                &KNOWN_EMBEDDING_PROVIDERS,
            )?;
        }

        if self.search.max_results == 0 {
            return Err(AppError::Config(
                "search.maxResults must be greater than zero".to_string(),
            ));
        }

        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AppError::Config(format!(
                    "llm.temperature must be between 0.0 and 2.0, got {}",
                    temperature
                )));
            }
        }

        Ok(())
    }
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}

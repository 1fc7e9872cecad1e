use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// German, unless `[translator] target` says otherwise.
pub const DEFAULT_TARGET_LANGUAGE: &str = "de";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Longest text a translation backend accepts in one request.
pub const MAX_TRANSLATION_CHARS: usize = 5000;

/// Top-level config (dolmetsch.toml + DOLMETSCH_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DolmetschConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather. Empty means "not configured".
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorBackend {
    #[default]
    Google,
    Deepl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub backend: TranslatorBackend,
    /// Target language code; the source language is always auto-detected.
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_google_base_url")]
    pub google_base_url: String,
    pub deepl: Option<DeeplConfig>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            backend: TranslatorBackend::default(),
            target: default_target(),
            google_base_url: default_google_base_url(),
            deepl: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeeplConfig {
    pub api_key: String,
    /// Free-tier keys (suffix `:fx`) must use `https://api-free.deepl.com`.
    #[serde(default = "default_deepl_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_prompt: default_system_prompt(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub anthropic: Option<AnthropicConfig>,
    pub openai: Option<OpenAiProviderConfig>,
    pub ollama: Option<OllamaConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

/// Any OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Overrides `agent.model` for requests routed to this provider.
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

fn default_target() -> String {
    DEFAULT_TARGET_LANGUAGE.to_string()
}
fn default_google_base_url() -> String {
    "https://translate.googleapis.com".to_string()
}
fn default_deepl_base_url() -> String {
    "https://api.deepl.com".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-6".to_string()
}
fn default_system_prompt() -> String {
    "You are a helpful assistant in a Telegram chat. Answer concisely. \
     You may use Markdown for emphasis, code and links."
        .to_string()
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

impl DolmetschConfig {
    /// Load config from a TOML file with DOLMETSCH_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.dolmetsch/dolmetsch.toml
    ///
    /// A missing file is not an error; every section has defaults.
    /// Nested keys use a double underscore, e.g.
    /// `DOLMETSCH_TELEGRAM__BOT_TOKEN` or `DOLMETSCH_TRANSLATOR__TARGET`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::DolmetschError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("DOLMETSCH_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.dolmetsch/dolmetsch.toml", home)
}

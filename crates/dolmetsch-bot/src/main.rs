use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use dolmetsch_agent::pipeline::Dispatcher;
use dolmetsch_agent::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};
use dolmetsch_agent::runtime::AgentRuntime;
use dolmetsch_core::config::DolmetschConfig;
use dolmetsch_sessions::ConversationStore;
use dolmetsch_telegram::TelegramAdapter;

/// Telegram bot that translates messages or chats through an LLM.
#[derive(Parser, Debug)]
#[command(name = "dolmetsch", version, about)]
struct Args {
    /// Path to dolmetsch.toml (falls back to $DOLMETSCH_CONFIG, then ~/.dolmetsch/dolmetsch.toml).
    #[arg(short = 'c', long = "config")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dolmetsch=info,dolmetsch_agent=info,dolmetsch_telegram=info".into()
            }),
        )
        .init();

    let args = Args::parse();

    // explicit path > DOLMETSCH_CONFIG env > ~/.dolmetsch/dolmetsch.toml
    let config_path = args
        .config
        .or_else(|| std::env::var("DOLMETSCH_CONFIG").ok());
    let config = DolmetschConfig::load(config_path.as_deref()).context("loading configuration")?;

    dolmetsch_core::language::validate_language(&config.translator.target)
        .context("translator.target")?;

    let translator = dolmetsch_agent::translate::from_config(&config.translator)
        .context("building translator")?;
    info!(
        backend = translator.name(),
        target = %config.translator.target,
        "translator ready"
    );

    let provider = build_provider(&config);
    let agent = AgentRuntime::new(provider, &config.agent);
    info!(provider = agent.provider().name(), model = agent.model(), "agent ready");

    let store = Arc::new(ConversationStore::new());
    let dispatcher = Arc::new(Dispatcher::new(store, translator, Arc::new(agent)));

    let adapter = TelegramAdapter::new(&config.telegram.bot_token, dispatcher)
        .context("telegram.bot_token is required (or DOLMETSCH_TELEGRAM__BOT_TOKEN)")?;
    adapter.run().await;

    info!("dolmetsch stopped");
    Ok(())
}

/// Build the LLM provider chain from config.
///
/// Priority order:
///   1. providers.anthropic (or ANTHROPIC_API_KEY)
///   2. providers.openai (or OPENAI_API_KEY)
///   3. providers.ollama
///
/// With more than one slot a ProviderRouter fails over in that order.
fn build_provider(config: &DolmetschConfig) -> Box<dyn LlmProvider> {
    use dolmetsch_agent::anthropic::AnthropicProvider;
    use dolmetsch_agent::ollama::OllamaProvider;
    use dolmetsch_agent::openai::OpenAiProvider;
    use dolmetsch_agent::router::{ProviderRouter, ProviderSlot};

    let mut slots: Vec<ProviderSlot> = Vec::new();

    // ── Anthropic ────────────────────────────────────────────────────────────
    let anthropic = config
        .providers
        .anthropic
        .as_ref()
        .map(|a| (a.api_key.clone(), Some(a.base_url.clone())))
        .or_else(|| env_key("ANTHROPIC_API_KEY").map(|key| (key, None)));
    if let Some((api_key, base_url)) = anthropic {
        let provider = AnthropicProvider::new(api_key, base_url);
        let kind = if provider.is_oauth() {
            "OAuth/subscription"
        } else {
            "API key"
        };
        info!("LLM provider slot[{}]: Anthropic {}", slots.len(), kind);
        slots.push(ProviderSlot::new(Box::new(provider), 1));
    }

    // ── OpenAI-compatible ────────────────────────────────────────────────────
    let openai = match config.providers.openai {
        Some(ref openai) => Some(
            OpenAiProvider::new(openai.api_key.clone(), Some(openai.base_url.clone()))
                .with_model(openai.model.clone()),
        ),
        None => env_key("OPENAI_API_KEY").map(|key| OpenAiProvider::new(key, None)),
    };
    if let Some(provider) = openai {
        info!("LLM provider slot[{}]: OpenAI", slots.len());
        slots.push(ProviderSlot::new(Box::new(provider), 1));
    }

    // ── Ollama (local, no key) ───────────────────────────────────────────────
    if let Some(ref ollama) = config.providers.ollama {
        info!(
            "LLM provider slot[{}]: Ollama ({})",
            slots.len(),
            ollama.base_url
        );
        slots.push(ProviderSlot::new(
            Box::new(OllamaProvider::new(Some(ollama.base_url.clone()))),
            0,
        ));
    }

    match slots.len() {
        0 => {
            tracing::warn!("No LLM provider configured; converse replies will fail");
            Box::new(NullProvider)
        }
        1 => slots.remove(0).provider,
        _ => {
            info!(
                "ProviderRouter: {} slots configured (automatic failover)",
                slots.len()
            );
            Box::new(ProviderRouter::new(slots))
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Placeholder provider when no API key is available.
struct NullProvider;

#[async_trait::async_trait]
impl LlmProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }
    async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        Err(ProviderError::Unavailable(
            "no LLM provider configured; set providers.anthropic.api_key in dolmetsch.toml".into(),
        ))
    }
}

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod pipeline;
pub mod provider;
pub mod router;
pub mod runtime;
pub mod strategy;
pub mod translate;

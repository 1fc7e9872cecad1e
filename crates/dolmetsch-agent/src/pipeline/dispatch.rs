use std::sync::Arc;

use tracing::{debug, info, warn};

use dolmetsch_core::language::language_label;
use dolmetsch_core::{ConversationId, Mode};
use dolmetsch_markup::{escape_text, sanitize};
use dolmetsch_sessions::ConversationStore;

use super::history::{render_table, EMPTY_HISTORY};
use super::slash::{Command, Inbound, COMMANDS};
use super::transport::{DeliveryError, Transport};
use crate::runtime::LlmBackend;
use crate::strategy::{
    ConverseStrategy, ProcessingResult, Strategy, StrategyError, TranslateStrategy,
};
use crate::translate::Translator;

/// What to send back for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Sent literally.
    Plain(String),
    /// Sent as HTML; `fallback` goes out as plain text if the channel
    /// rejects the markup.
    Markup { html: String, fallback: String },
}

/// Routes each message of a conversation to the strategy of its mode and
/// handles the mode, history and help commands.
pub struct Dispatcher {
    store: Arc<ConversationStore>,
    translate: TranslateStrategy,
    converse: ConverseStrategy,
    /// Column header of the history table, e.g. `German`.
    target_label: String,
}

impl Dispatcher {
    pub fn new(
        store: Arc<ConversationStore>,
        translator: Arc<dyn Translator>,
        llm: Arc<dyn LlmBackend>,
    ) -> Self {
        let target_label = language_label(translator.target());
        Self {
            store,
            translate: TranslateStrategy::new(translator),
            converse: ConverseStrategy::new(llm),
            target_label,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Parse, answer and deliver one inbound message.
    pub async fn handle(&self, id: &ConversationId, inbound: &Inbound, transport: &dyn Transport) {
        if let Some(reply) = self.respond(id, inbound).await {
            self.deliver(id, reply, transport).await;
        }
    }

    /// Compute the reply to one inbound message. Blank free text gets none.
    pub async fn respond(&self, id: &ConversationId, inbound: &Inbound) -> Option<Reply> {
        let reply = match inbound {
            Inbound::Text(text) if text.trim().is_empty() => return None,
            Inbound::Text(text) => {
                // Read under the turn lock so a concurrent /mode cannot slip in
                // between reading the mode and running the strategy.
                let mut state = self.store.lock(id).await;
                let strategy = self.strategy(state.mode);
                info!(conversation = %id, mode = %state.mode, "routing message");
                let outcome = strategy.process(text, &mut *state).await;
                drop(state);
                self.render(id, outcome)
            }
            Inbound::Command(command) => self.command(id, command).await,
        };
        Some(reply)
    }

    async fn command(&self, id: &ConversationId, command: &Command) -> Reply {
        match command {
            Command::Start | Command::Help => self.help(id).await,
            Command::Mode(args) => self.mode_command(id, args).await,
            Command::Translate(text) => self.direct(id, Mode::Translate, text, "/translate").await,
            Command::Llm(text) => self.direct(id, Mode::Converse, text, "/llm").await,
            Command::History => self.history(id).await,
            Command::Unknown(name) => Reply::Plain(format!(
                "Unknown command /{name}. Send /help for the list of commands."
            )),
        }
    }

    fn strategy(&self, mode: Mode) -> &dyn Strategy {
        match mode {
            Mode::Translate => &self.translate,
            Mode::Converse => &self.converse,
        }
    }

    /// Run a strategy once without touching the stored mode.
    async fn direct(&self, id: &ConversationId, mode: Mode, text: &str, usage: &str) -> Reply {
        if text.trim().is_empty() {
            return Reply::Plain(format!("Usage: {usage} <text>"));
        }
        let mut state = self.store.lock(id).await;
        info!(conversation = %id, mode = %mode, "direct command");
        let outcome = self.strategy(mode).process(text, &mut *state).await;
        drop(state);
        self.render(id, outcome)
    }

    async fn mode_command(&self, id: &ConversationId, args: &[String]) -> Reply {
        match args {
            [] => {
                let mode = self.store.get(id).await.mode;
                Reply::Markup {
                    html: format!(
                        "Current mode: <b>{mode}</b>\nValid modes: {}",
                        Mode::listing()
                    ),
                    fallback: format!("Current mode: {mode}\nValid modes: {}", Mode::listing()),
                }
            }
            [name] => match name.parse::<Mode>() {
                Ok(mode) => {
                    self.store.set_mode(id, mode).await;
                    info!(conversation = %id, mode = %mode, "mode switched");
                    Reply::Plain(format!("Mode switched to {mode}."))
                }
                Err(e) => {
                    debug!(conversation = %id, err = %e, "rejected mode switch");
                    Reply::Plain(format!(
                        "Unknown mode '{name}'. Valid modes: {}",
                        Mode::listing()
                    ))
                }
            },
            _ => Reply::Plain(format!(
                "Usage: /mode [name]\nValid modes: {}",
                Mode::listing()
            )),
        }
    }

    async fn history(&self, id: &ConversationId) -> Reply {
        let log = self.store.get(id).await.translation_log;
        if log.is_empty() {
            return Reply::Plain(EMPTY_HISTORY.to_string());
        }
        let table = render_table(&log, &self.target_label);
        Reply::Markup {
            html: format!("<pre>{}</pre>", escape_text(&table)),
            fallback: table,
        }
    }

    async fn help(&self, id: &ConversationId) -> Reply {
        let mode = self.store.get(id).await.mode;
        let intro = format!(
            "Send any text and it is handled in the current mode.\n\
             translate: into {}\n\
             converse: chat with the language model",
            self.target_label
        );

        let mut plain = format!("Current mode: {mode}\n{intro}\n");
        let mut html = format!("Current mode: <b>{mode}</b>\n{}\n", escape_text(&intro));
        for (name, description) in COMMANDS {
            plain.push_str(&format!("\n/{name} - {description}"));
            html.push_str(&format!("\n/{name} - {}", escape_text(description)));
        }
        Reply::Markup {
            html,
            fallback: plain,
        }
    }

    /// Converse output is markdown and goes through the sanitizer; translations
    /// are sent verbatim.
    fn render(
        &self,
        id: &ConversationId,
        outcome: Result<ProcessingResult, StrategyError>,
    ) -> Reply {
        match outcome {
            Ok(ProcessingResult {
                text,
                mode: Mode::Converse,
            }) => {
                let html = sanitize(&text);
                if html.is_empty() {
                    Reply::Plain(text)
                } else {
                    Reply::Markup {
                        html,
                        fallback: text,
                    }
                }
            }
            Ok(ProcessingResult {
                text,
                mode: Mode::Translate,
            }) => Reply::Plain(text),
            Err(e) => {
                warn!(conversation = %id, err = %e, "strategy failed");
                Reply::Plain(e.user_notice().to_string())
            }
        }
    }

    /// Send a reply; rejected markup is retried once as the raw text.
    pub async fn deliver(&self, id: &ConversationId, reply: Reply, transport: &dyn Transport) {
        match reply {
            Reply::Plain(text) => {
                if let Err(e) = transport.send(id, &text, false).await {
                    warn!(conversation = %id, err = %e, "failed to send reply");
                }
            }
            Reply::Markup { html, fallback } => match transport.send(id, &html, true).await {
                Ok(()) => {}
                Err(DeliveryError::Rejected(reason)) => {
                    warn!(conversation = %id, %reason, "markup rejected, sending plain text");
                    if let Err(e) = transport.send(id, &fallback, false).await {
                        warn!(conversation = %id, err = %e, "failed to send plain fallback");
                    }
                }
                Err(e) => warn!(conversation = %id, err = %e, "failed to send reply"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dolmetsch_core::TranscriptEntry;

    use crate::provider::ProviderError;
    use crate::translate::TranslateError;

    struct Upper;

    #[async_trait]
    impl Translator for Upper {
        fn name(&self) -> &str {
            "upper"
        }
        fn target(&self) -> &str {
            "de"
        }
        async fn translate(&self, text: &str) -> Result<String, TranslateError> {
            Ok(text.to_uppercase())
        }
    }

    struct Echo;

    #[async_trait]
    impl LlmBackend for Echo {
        async fn complete(&self, transcript: &[TranscriptEntry]) -> Result<String, ProviderError> {
            Ok(transcript
                .last()
                .map(|e| e.content.clone())
                .unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, bool)>>,
        reject_markup: bool,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(
            &self,
            _conversation: &ConversationId,
            text: &str,
            render_as_markup: bool,
        ) -> Result<(), DeliveryError> {
            if render_as_markup && self.reject_markup {
                return Err(DeliveryError::Rejected("can't parse entities".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), render_as_markup));
            Ok(())
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(ConversationStore::new()),
            Arc::new(Upper),
            Arc::new(Echo),
        )
    }

    fn id() -> ConversationId {
        ConversationId::from(42_i64)
    }

    async fn reply(d: &Dispatcher, text: &str) -> Reply {
        d.respond(&id(), &Inbound::parse(text)).await.unwrap()
    }

    #[tokio::test]
    async fn blank_text_gets_no_reply() {
        let d = dispatcher();
        assert_eq!(d.respond(&id(), &Inbound::parse("  ")).await, None);
    }

    #[tokio::test]
    async fn mode_status_reports_current_mode() {
        let d = dispatcher();
        match reply(&d, "/mode").await {
            Reply::Markup { html, fallback } => {
                assert!(html.contains("<b>translate</b>"));
                assert!(fallback.contains("translate, converse"));
            }
            other => panic!("expected markup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mode_switch_is_case_insensitive() {
        let d = dispatcher();
        assert_eq!(
            reply(&d, "/mode CONVERSE").await,
            Reply::Plain("Mode switched to converse.".to_string())
        );
        assert_eq!(d.store().get(&id()).await.mode, Mode::Converse);
    }

    #[tokio::test]
    async fn too_many_mode_arguments_is_usage_error() {
        let d = dispatcher();
        let Reply::Plain(text) = reply(&d, "/mode translate converse").await else {
            panic!("expected plain reply");
        };
        assert!(text.starts_with("Usage: /mode"));
        assert_eq!(d.store().get(&id()).await.mode, Mode::Translate);
    }

    #[tokio::test]
    async fn history_is_preformatted_and_escaped() {
        let d = dispatcher();
        reply(&d, "a<b").await;
        match reply(&d, "/history").await {
            Reply::Markup { html, fallback } => {
                assert!(html.starts_with("<pre>+"));
                assert!(html.contains("| a&lt;b      | A&lt;B    |"));
                assert!(fallback.contains("| Original | German |"));
            }
            other => panic!("expected markup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn help_lists_commands() {
        let d = dispatcher();
        let Reply::Markup { html, fallback } = reply(&d, "/help").await else {
            panic!("expected markup reply");
        };
        for (name, _) in COMMANDS {
            assert!(fallback.contains(&format!("/{name} ")));
        }
        assert!(html.contains("translate: into German"));
        assert_eq!(reply(&d, "/start").await, Reply::Markup { html, fallback });
    }

    #[tokio::test]
    async fn unknown_command_is_not_routed() {
        let d = dispatcher();
        let Reply::Plain(text) = reply(&d, "/weather").await else {
            panic!("expected plain reply");
        };
        assert!(text.contains("/help"));
        let state = d.store().get(&id()).await;
        assert!(state.translation_log.is_empty());
    }

    #[tokio::test]
    async fn rejected_markup_falls_back_to_raw_text() {
        let d = dispatcher();
        let transport = Recorder {
            reject_markup: true,
            ..Recorder::default()
        };
        d.handle(&id(), &Inbound::parse("/llm **hi**"), &transport).await;
        assert_eq!(
            *transport.sent.lock().unwrap(),
            vec![("**hi**".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn accepted_markup_is_sent_once() {
        let d = dispatcher();
        let transport = Recorder::default();
        d.handle(&id(), &Inbound::parse("/llm **hi**"), &transport).await;
        assert_eq!(
            *transport.sent.lock().unwrap(),
            vec![("<b>hi</b>".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn translation_is_sent_as_plain_text() {
        let d = dispatcher();
        let transport = Recorder::default();
        d.handle(&id(), &Inbound::parse("<b>x</b>"), &transport).await;
        assert_eq!(
            *transport.sent.lock().unwrap(),
            vec![("<B>X</B>".to_string(), false)]
        );
    }
}

use anyhow::Result;
use tracing::{info, warn};

use crate::completions::base::{CompletionProvider, CompletionRequest};
use crate::completions::wire::{descriptor_to_wire, message_to_wire, WireMessage};
use crate::dispatcher::ToolDispatcher;
use crate::models::message::Message;
use crate::session_log::SessionLog;
use crate::transcript::Transcript;

/// Instructional message seeded ahead of all user-visible history.
pub const DEVELOPER_PROMPT: &str =
    "You are a helpful AI assistant. Be concise and clear in your responses.";

/// What a submitted input line amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// User asked to end the session
    Exit,
    /// A local command was handled without contacting the completion API
    Command,
    /// A full conversation turn ran; the transcript gained messages
    Reply,
    /// Blank input, nothing to do
    Empty,
}

enum Command {
    Exit,
    SetModel(String),
    ToggleTools,
}

impl Command {
    /// Commands are matched exactly against the trimmed input line.
    fn parse(line: &str) -> Option<Command> {
        if line == "/exit" {
            return Some(Command::Exit);
        }
        if line == "/toggletools" {
            return Some(Command::ToggleTools);
        }
        if let Some(rest) = line.strip_prefix("/setmodel ") {
            return Some(Command::SetModel(rest.trim().to_string()));
        }
        None
    }
}

/// The conversation engine: owns the transcript, drives the two-phase
/// request cycle, and hands tool calls to the dispatcher.
///
/// One turn is in flight at a time (`submit` takes `&mut self`). A turn
/// walks: append user message, first completion with the tool catalog
/// offered, then either done, or one round of tool execution followed by a
/// second completion issued without tools. The model is never offered tools
/// more than once per user turn.
pub struct Conversation {
    completions: Box<dyn CompletionProvider>,
    dispatcher: ToolDispatcher,
    transcript: Transcript,
    model: String,
    hide_tool_messages: bool,
    session_log: Option<SessionLog>,
}

impl Conversation {
    pub fn new(
        completions: Box<dyn CompletionProvider>,
        dispatcher: ToolDispatcher,
        model: impl Into<String>,
        session_log: Option<SessionLog>,
    ) -> Self {
        let mut conversation = Conversation {
            completions,
            dispatcher,
            transcript: Transcript::new(),
            model: model.into(),
            hide_tool_messages: true,
            session_log,
        };
        conversation.record(Message::developer(DEVELOPER_PROMPT));
        conversation
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn hide_tool_messages(&self) -> bool {
        self.hide_tool_messages
    }

    pub fn session_log_enabled(&self) -> bool {
        self.session_log.is_some()
    }

    /// Handle one line of user input: a command, a chat message, or nothing.
    ///
    /// A completion failure propagates as the turn's error; the transcript
    /// is left exactly as it stood before the failed call, and the next
    /// submit starts a fresh turn.
    pub async fn submit(&mut self, line: &str) -> Result<TurnOutcome> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(TurnOutcome::Empty);
        }

        if let Some(command) = Command::parse(trimmed) {
            return Ok(self.apply(command));
        }

        self.run_turn(trimmed).await?;
        Ok(TurnOutcome::Reply)
    }

    fn apply(&mut self, command: Command) -> TurnOutcome {
        match command {
            Command::Exit => TurnOutcome::Exit,
            Command::SetModel(model) => {
                if !model.is_empty() {
                    info!(model = %model, "switching model");
                    self.record(Message::system(format!("Model changed to {model}")));
                    self.model = model;
                }
                TurnOutcome::Command
            }
            Command::ToggleTools => {
                self.hide_tool_messages = !self.hide_tool_messages;
                let state = if self.hide_tool_messages {
                    "hidden"
                } else {
                    "visible"
                };
                self.record(Message::system(format!("Tool messages are now {state}")));
                TurnOutcome::Command
            }
        }
    }

    async fn run_turn(&mut self, content: &str) -> Result<()> {
        self.record(Message::user(content));

        let catalog: Vec<_> = self
            .dispatcher
            .registry()
            .all()
            .iter()
            .map(descriptor_to_wire)
            .collect();
        let mut request = CompletionRequest::new(self.model.as_str(), self.wire_messages());
        if !catalog.is_empty() {
            request = request.with_tools(catalog);
        }

        let reply = self.completions.complete(request).await?;

        if reply.tool_calls.is_empty() {
            self.record(Message::assistant(reply.content.unwrap_or_default()));
            return Ok(());
        }

        self.record(
            Message::assistant(reply.content.unwrap_or_default())
                .with_tool_calls(reply.tool_calls.clone()),
        );

        let results = self.dispatcher.dispatch(&reply.tool_calls).await;
        for result in results {
            self.record(result);
        }

        // Follow-up request deliberately carries no tools: one tool round
        // per user turn, then the model must answer.
        let followup = CompletionRequest::new(self.model.as_str(), self.wire_messages());
        let second = self.completions.complete(followup).await?;
        self.record(Message::assistant(
            second.content.unwrap_or_else(|| "No response".to_string()),
        ));
        Ok(())
    }

    fn wire_messages(&self) -> Vec<WireMessage> {
        self.transcript.messages().iter().map(message_to_wire).collect()
    }

    /// Append to the transcript and mirror to the session log. The mirror
    /// is best effort; a failed write is logged and the turn continues.
    fn record(&mut self, message: Message) {
        if let Some(log) = &self.session_log {
            if let Err(err) = log.append(&message) {
                warn!(%err, "failed to mirror message to session log");
            }
        }
        self.transcript.push(message);
    }

    /// Close all provider connections, best effort.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completions::base::CompletionReply;
    use crate::completions::mock::{FailingCompletions, MockCompletions};
    use crate::models::role::Role;
    use crate::models::tool::ToolCall;
    use crate::registry::ToolRegistry;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn empty_dispatcher() -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(ToolRegistry::new()), HashMap::new())
    }

    fn conversation(replies: Vec<CompletionReply>) -> (Conversation, MockCompletions) {
        let completions = MockCompletions::new(replies);
        let conversation = Conversation::new(
            Box::new(completions.clone()),
            empty_dispatcher(),
            "gpt-4o",
            None,
        );
        (conversation, completions)
    }

    #[tokio::test]
    async fn seeds_developer_message() {
        let (conversation, _) = conversation(vec![]);
        let messages = conversation.transcript().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Developer);
        assert_eq!(messages[0].content, DEVELOPER_PROMPT);
    }

    #[tokio::test]
    async fn empty_input_is_a_noop() {
        let (mut conversation, completions) = conversation(vec![]);
        assert_eq!(conversation.submit("   ").await.unwrap(), TurnOutcome::Empty);
        assert!(completions.requests().is_empty());
        assert_eq!(conversation.transcript().len(), 1);
    }

    #[tokio::test]
    async fn exit_command_does_not_contact_api() {
        let (mut conversation, completions) = conversation(vec![]);
        assert_eq!(conversation.submit("/exit").await.unwrap(), TurnOutcome::Exit);
        assert!(completions.requests().is_empty());
    }

    #[tokio::test]
    async fn setmodel_updates_model_and_appends_system_message() {
        let (mut conversation, completions) = conversation(vec![]);
        let outcome = conversation.submit("/setmodel gpt-5").await.unwrap();

        assert_eq!(outcome, TurnOutcome::Command);
        assert_eq!(conversation.model(), "gpt-5");
        let last = conversation.transcript().messages().last().unwrap();
        assert_eq!(last.role, Role::System);
        assert_eq!(last.content, "Model changed to gpt-5");
        assert!(completions.requests().is_empty());
    }

    #[tokio::test]
    async fn setmodel_without_id_is_a_handled_noop() {
        let (mut conversation, _) = conversation(vec![]);
        let outcome = conversation.submit("/setmodel  ").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Command);
        assert_eq!(conversation.model(), "gpt-4o");
        assert_eq!(conversation.transcript().len(), 1);
    }

    #[tokio::test]
    async fn toggletools_flips_visibility_and_reports_new_state() {
        let (mut conversation, _) = conversation(vec![]);
        assert!(conversation.hide_tool_messages());

        conversation.submit("/toggletools").await.unwrap();
        assert!(!conversation.hide_tool_messages());
        assert_eq!(
            conversation.transcript().messages().last().unwrap().content,
            "Tool messages are now visible"
        );

        conversation.submit("/toggletools").await.unwrap();
        assert!(conversation.hide_tool_messages());
        assert_eq!(
            conversation.transcript().messages().last().unwrap().content,
            "Tool messages are now hidden"
        );
    }

    #[tokio::test]
    async fn plain_reply_appends_two_messages() {
        let (mut conversation, completions) =
            conversation(vec![CompletionReply::text("hi there")]);
        let before = conversation.transcript().len();

        let outcome = conversation.submit("hello").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Reply);

        let messages = conversation.transcript().messages();
        assert_eq!(messages.len(), before + 2);
        assert_eq!(messages[before].role, Role::User);
        assert_eq!(messages[before].content, "hello");
        assert_eq!(messages[before + 1].role, Role::Assistant);
        assert_eq!(messages[before + 1].content, "hi there");

        // Single completion call, no tools offered with an empty catalog
        let requests = completions.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_none());
    }

    #[tokio::test]
    async fn completion_failure_leaves_transcript_at_pre_call_state() {
        let mut conversation = Conversation::new(
            Box::new(FailingCompletions),
            empty_dispatcher(),
            "gpt-4o",
            None,
        );

        let result = conversation.submit("hello").await;
        assert!(result.is_err());

        // The user message from this turn stands; nothing partial follows it.
        let messages = conversation.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);

        // The session is back to idle and accepts the next turn.
        assert_eq!(
            conversation.submit("/exit").await.unwrap(),
            TurnOutcome::Exit
        );
    }

    #[tokio::test]
    async fn second_request_never_offers_tools() {
        use crate::models::tool::ToolDescriptor;
        use serde_json::json;

        let mut registry = ToolRegistry::new();
        registry.register(vec![ToolDescriptor::new(
            "get_weather",
            "Current weather",
            json!({"type": "object"}),
            "weather",
        )]);
        // No provider registered for "weather": dispatch will produce an
        // error-shaped result, which is fine for this property.
        let dispatcher = ToolDispatcher::new(Arc::new(registry), HashMap::new());

        let completions = MockCompletions::new(vec![
            CompletionReply::tool_requests(vec![ToolCall::function(
                "c1",
                "get_weather",
                r#"{"location":"Boston"}"#,
            )]),
            CompletionReply::text("all done"),
        ]);
        let mut conversation = Conversation::new(
            Box::new(completions.clone()),
            dispatcher,
            "gpt-4o",
            None,
        );

        conversation.submit("weather in boston?").await.unwrap();

        let requests = completions.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].tools.is_some());
        assert_eq!(requests[0].tool_choice.as_deref(), Some("auto"));
        assert!(requests[1].tools.is_none());
        assert!(requests[1].tool_choice.is_none());
    }

    #[tokio::test]
    async fn session_log_mirrors_every_append() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("session.jsonl");
        let completions = MockCompletions::new(vec![CompletionReply::text("hi")]);
        let mut conversation = Conversation::new(
            Box::new(completions),
            empty_dispatcher(),
            "gpt-4o",
            Some(SessionLog::new(&log_path)),
        );

        conversation.submit("hello").await.unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        // developer seed + user + assistant
        assert_eq!(contents.lines().count(), 3);
    }

    #[tokio::test]
    async fn unwritable_session_log_never_fails_the_turn() {
        let completions = MockCompletions::new(vec![CompletionReply::text("hi there")]);
        let mut conversation = Conversation::new(
            Box::new(completions),
            empty_dispatcher(),
            "gpt-4o",
            Some(SessionLog::new("/definitely/not/a/dir/session.jsonl")),
        );

        let outcome = conversation.submit("hello").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Reply);

        let last = conversation.transcript().messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "hi there");
    }

    #[tokio::test]
    async fn reports_whether_session_log_is_enabled() {
        let (conversation, _) = conversation(vec![]);
        assert!(!conversation.session_log_enabled());

        let logged = Conversation::new(
            Box::new(MockCompletions::new(vec![])),
            empty_dispatcher(),
            "gpt-4o",
            Some(SessionLog::in_current_dir()),
        );
        assert!(logged.session_log_enabled());
    }
}

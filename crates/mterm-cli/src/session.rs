use anyhow::Result;
use bat::PrettyPrinter;
use cliclack::{input, spinner};
use console::style;

use mterm::conversation::{Conversation, TurnOutcome};
use mterm::models::role::Role;

/// The interactive prompt loop around one conversation.
pub struct Session {
    conversation: Conversation,
}

impl Session {
    pub fn new(conversation: Conversation) -> Self {
        Session { conversation }
    }

    pub async fn start(&mut self) -> Result<()> {
        println!(
            "mterm [{}] {}",
            style(self.conversation.model()).yellow(),
            style("- '/exit' to quit, '/setmodel <id>' to change model, '/toggletools' to show or hide tool messages").dim()
        );
        println!();

        loop {
            let line: String = input("Message:").placeholder("").multiline().interact()?;
            let is_command = line.trim_start().starts_with('/');

            let spin = (!is_command).then(spinner);
            if let Some(spin) = &spin {
                spin.start("awaiting reply");
            }

            let before = self.conversation.transcript().len();
            let result = self.conversation.submit(&line).await;

            if let Some(spin) = &spin {
                spin.stop("");
            }

            match result {
                Ok(TurnOutcome::Exit) => break,
                Ok(TurnOutcome::Empty) => continue,
                Ok(_) => self.render_since(before),
                Err(err) => println!("{}", style(format!("Error: {err}")).red()),
            }
            println!();
        }

        self.conversation.shutdown().await;
        let closing = if self.conversation.session_log_enabled() {
            "Session closed. Transcript recorded to session.jsonl"
        } else {
            "Session closed."
        };
        println!("{}", style(closing).dim());
        Ok(())
    }

    /// Print the messages a turn appended. The user's own input is not
    /// echoed back; developer messages stay hidden; tool messages follow
    /// the visibility toggle.
    fn render_since(&self, from: usize) {
        let hide_tools = self.conversation.hide_tool_messages();
        for message in &self.conversation.transcript().messages()[from..] {
            match message.role {
                Role::Assistant => render_markdown(&message.content),
                Role::System => println!("{}", style(&message.content).cyan()),
                Role::Tool if !hide_tools => {
                    let name = message.name.as_deref().unwrap_or("tool");
                    println!("{}", style(format!("[{name}] {}", message.content)).dim());
                }
                _ => {}
            }
        }
    }
}

fn render_markdown(content: &str) {
    let printed = PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print();
    if printed.is_err() {
        println!("{content}");
    }
}

use crate::models::message::Message;
use crate::models::role::Role;

/// The append-only ordered log of conversation messages.
///
/// Messages are immutable once appended and never reordered. The
/// conversation engine owns the transcript; readers get either the full
/// slice (for building requests) or a filtered projection (for display).
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The display projection: developer messages are always hidden, tool
    /// messages optionally so.
    pub fn visible(&self, hide_tools: bool) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |message| match message.role {
            Role::Developer => false,
            Role::Tool => !hide_tools,
            _ => true,
        })
    }
}

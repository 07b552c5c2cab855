use serde::{Deserialize, Serialize};

/// The speaker of a transcript message.
///
/// `Developer` is the non-visible instructional role injected before
/// user-visible history; it maps to `system` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
    Tool,
}

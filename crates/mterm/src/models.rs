//! These models represent the objects passed around by the conversation engine
//!
//! There are a few related formats in play:
//! - the internal transcript messages, which the UI reads and the engine owns
//! - openai chat-completion messages/tools, sent to the LLM
//! - MCP requests/results, exchanged with the tool-provider processes
//!
//! These overlap to varying degrees. Boundary data is converted into the
//! internal structs immediately using to/from helpers; because each format
//! needs compatibility handling, the internal models are not an exact match
//! to any of them.
pub mod message;
pub mod role;
pub mod tool;

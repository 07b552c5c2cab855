pub mod completions;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod errors;
pub mod models;
pub mod providers;
pub mod registry;
pub mod session_log;
pub mod transcript;

pub mod base;
pub mod mock;
pub mod openai;
pub mod wire;

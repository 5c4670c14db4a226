pub mod common;
pub mod config;
pub mod function_env;
pub mod placeholder;
pub mod provision;
pub mod stack;
pub mod template;

pub use common::errors::Error;
pub use config::StackConfig;
pub use stack::StackDefinition;

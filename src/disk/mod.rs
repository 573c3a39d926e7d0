mod cli;
pub mod commands;
pub mod gpt;
pub mod layout;
mod mount;
pub mod resolver;
pub mod types;
mod utils;

pub use cli::{BuildCli, LayoutAction};

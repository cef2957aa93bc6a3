pub mod commands;
pub mod config;
pub mod data;
pub mod embeds;
pub mod gateway;
pub mod handlers;
pub mod logging;
pub mod moderation;
pub mod relay;
pub mod store;

pub const BOT_NAME: &str = "scammer_guard";
pub const COMMAND_TARGET: &str = "scammer_guard::command";
pub const ERROR_TARGET: &str = "scammer_guard::error";
pub const EVENT_TARGET: &str = "scammer_guard::handlers";
pub const STORE_TARGET: &str = "scammer_guard::store";
pub const CONSOLE_TARGET: &str = "scammer_guard";

pub use config::Config;
pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

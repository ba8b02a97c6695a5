pub mod commands;
pub mod data;
pub mod filter;
pub mod handlers;
pub mod logging;

// Customize these constants for your bot
pub const BOT_NAME: &str = "word_warden";
pub const COMMAND_TARGET: &str = "word_warden::command";
pub const ERROR_TARGET: &str = "word_warden::error";
pub const EVENT_TARGET: &str = "word_warden::handlers";
pub const FILTER_TARGET: &str = "word_warden::filter";
pub const CONSOLE_TARGET: &str = "word_warden";

pub use data::{Data, DataInner};
pub use filter::{CheckOutcome, FilterAction, FilterMode, FilterService, TestReport};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

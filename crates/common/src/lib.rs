#![forbid(unsafe_code)]

mod error;
mod time;

pub use error::*;
pub use time::Timestamp;

pub const DEFAULT_SHELL_PROMPT: &str = "evokv> ";
pub const DEFAULT_LOG_FILTER: &str = "evokv_cli=info,evokv_storage=warn";
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

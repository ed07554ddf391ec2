pub mod config;
pub mod rule;

pub use config::RulesConfig;
pub use rule::*;

//! Infrastructure layer module
//!
//! - Configuration management (figment, `.dino/` project files)
//! - Logging infrastructure (tracing-subscriber, tracing-appender)

pub mod config;
pub mod logging;

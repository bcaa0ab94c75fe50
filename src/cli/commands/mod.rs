//! CLI command implementations.

pub mod init;
pub mod report;
pub mod run;
pub mod space;

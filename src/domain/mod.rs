//! Domain layer for dino
//!
//! This module contains the core models, port traits and errors.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};

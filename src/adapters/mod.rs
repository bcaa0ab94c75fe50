//! Adapters implementing the domain ports.

pub mod explorers;
pub mod simulators;
pub mod tables;

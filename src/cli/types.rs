//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::init::InitArgs;
use super::commands::report::ReportArgs;
use super::commands::run::RunArgs;
use super::commands::space::SpaceArgs;

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(name = "dino")]
#[command(about = "Dino - performance-envelope exploration for an intersection DUT", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file; `.dino/config.yaml` and `.dino/local.yaml` when omitted
    #[arg(short, long, global = true, env = "DINO_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration and a sample parameter space
    Init(InitArgs),

    /// Validate and display the parameter space
    Space(SpaceArgs),

    /// Run an exploration campaign and write its tables
    Run(RunArgs),

    /// Summarize a persisted score table per envelope and stage
    Report(ReportArgs),
}

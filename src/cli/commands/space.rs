//! Implementation of the `dino space` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::config::Config;
use crate::domain::models::parameter_space::{Feature, ParameterSpace};

/// Arguments of `dino space`.
#[derive(Args, Debug)]
pub struct SpaceArgs {
    /// Parameter space file; the configured `parameter_space` when omitted
    #[arg(short, long)]
    pub space: Option<PathBuf>,
}

/// Result of `dino space`.
#[derive(Debug, Serialize)]
pub struct SpaceOutput {
    /// Parameter space file
    pub path: PathBuf,
    /// Number of features
    pub dimension: usize,
    /// The features, in column order
    pub features: Vec<Feature>,
}

impl CommandOutput for SpaceOutput {
    fn to_human(&self) -> String {
        format!(
            "{}\n{} features from {}",
            TableFormatter::new().format_features(&self.features),
            self.dimension,
            self.path.display()
        )
    }
}

/// Validate a parameter space and print its features.
pub async fn execute(args: SpaceArgs, config: &Config, json_mode: bool) -> Result<()> {
    let path = args.space.unwrap_or_else(|| config.parameter_space.clone());
    let space = ParameterSpace::from_yaml_file(&path)
        .with_context(|| format!("Invalid parameter space {}", path.display()))?;

    let output_data = SpaceOutput {
        path,
        dimension: space.dimension(),
        features: space.features().to_vec(),
    };
    output(&output_data, json_mode);
    Ok(())
}

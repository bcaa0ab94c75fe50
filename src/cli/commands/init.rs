//! Implementation of the `dino init` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::models::intersection::{Approach, Route, Turn};
use crate::domain::models::parameter_space::{Feature, ParameterSpace};
use crate::infrastructure::config::CONFIG_DIR;

/// Arguments of `dino init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite existing configuration and parameter space files
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

/// Result of `dino init`.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    /// Whether initialization went ahead
    pub success: bool,
    /// Outcome message
    pub message: String,
    /// Directory that was initialized
    pub initialized_path: PathBuf,
    /// Files written, relative to the initialized directory
    pub files_written: Vec<String>,
    /// Features in the sample parameter space
    pub features: usize,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.files_written.is_empty() {
            lines.push("\nWrote:".to_string());
            for file in &self.files_written {
                lines.push(format!("  - {file}"));
            }
            lines.push(format!("\nSample parameter space has {} features", self.features));
        }
        lines.join("\n")
    }
}

/// Sample space for the gamma-cross intersection: start time, DUT speed,
/// one speed per incoming lane and one vehicle type per queue slot.
pub fn sample_features(traffic_slots: u8) -> Vec<Feature> {
    let mut time0 = Feature::new("time0", 0.0, 60.0, Some(0.5));
    time0.uom = Some("s".to_string());
    let mut dut_speed = Feature::new("dut_s0", 20.0, 60.0, Some(5.0));
    dut_speed.uom = Some("km/h".to_string());
    let mut features = vec![time0, dut_speed];

    for approach in Approach::ALL {
        for turn in Turn::ALL {
            let route = Route::new(approach, turn);
            let mut speed = Feature::new(format!("{route}_s0"), 20.0, 60.0, Some(5.0));
            speed.uom = Some("km/h".to_string());
            features.push(speed);
        }
    }
    for slot in 1..=traffic_slots {
        for approach in Approach::ALL {
            for turn in Turn::ALL {
                let route = Route::new(approach, turn);
                features.push(Feature::new(format!("vtype_{route}{slot}"), 0.0, 2.0, Some(1.0)));
            }
        }
    }
    features
}

async fn write_file(root: &Path, path: &Path, contents: String, written: &mut Vec<String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    let relative = path.strip_prefix(root).unwrap_or(path);
    written.push(relative.display().to_string());
    Ok(())
}

/// Write `.dino/config.yaml` and a sample parameter space.
pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let config_path = target_path.join(CONFIG_DIR).join("config.yaml");
    if config_path.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path,
            files_written: vec![],
            features: 0,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    let config = Config::default();
    let features = sample_features(config.scenario.traffic_slots);
    // Round-trip through the validating constructor before writing
    let space = ParameterSpace::new(features).context("Sample parameter space is invalid")?;

    let mut files_written = vec![];
    write_file(
        &target_path,
        &config_path,
        serde_yaml::to_string(&config).context("Failed to serialize configuration")?,
        &mut files_written,
    )
    .await?;
    write_file(
        &target_path,
        &target_path.join(&config.parameter_space),
        serde_yaml::to_string(space.features()).context("Failed to serialize parameter space")?,
        &mut files_written,
    )
    .await?;
    fs::create_dir_all(target_path.join(&config.output.dir))
        .await
        .context("Failed to create output directory")?;

    let output_data = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path,
        files_written,
        features: space.dimension(),
    };

    output(&output_data, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ConfigLoader;
    use tempfile::TempDir;

    #[test]
    fn test_sample_features() {
        let features = sample_features(5);
        // time0, dut_s0, 12 lane speeds, 60 slot types
        assert_eq!(features.len(), 74);
        assert!(features.iter().any(|f| f.name == "eb_left_s0"));
        assert!(features.iter().any(|f| f.name == "vtype_sb_right5"));
    }

    #[tokio::test]
    async fn test_init_writes_loadable_files() {
        let dir = TempDir::new().unwrap();
        execute(
            InitArgs {
                force: false,
                path: dir.path().to_path_buf(),
            },
            true,
        )
        .await
        .unwrap();

        let config = ConfigLoader::load_from_file(dir.path().join(".dino/config.yaml")).unwrap();
        let space =
            ParameterSpace::from_yaml_file(dir.path().join(&config.parameter_space)).unwrap();
        assert_eq!(space.dimension(), 74);
        assert!(dir.path().join("temp").is_dir());
    }
}

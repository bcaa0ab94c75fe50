//! Table output formatting for CLI commands
//!
//! Formats parameter spaces and campaign summaries using comfy-table.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::env;

use crate::cli::commands::report::StageSummary;
use crate::domain::models::parameter_space::Feature;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    /// Formatter with colors when the environment allows them.
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Formatter with explicit color and width settings.
    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// One row per feature with its range, increment and grid size.
    pub fn format_features(&self, features: &[Feature]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Feature", "Min", "Max", "Inc", "Unit", "Levels"]));

        for feature in features {
            let levels = feature.increment.map_or_else(
                || "continuous".to_string(),
                |inc| (((feature.max - feature.min) / inc).round() as u64 + 1).to_string(),
            );
            table.add_row(vec![
                Cell::new(&feature.name),
                numeric(feature.min),
                numeric(feature.max),
                feature
                    .increment
                    .map_or_else(|| Cell::new("-"), numeric),
                Cell::new(feature.uom.as_deref().unwrap_or("-")),
                Cell::new(levels).set_alignment(CellAlignment::Right),
            ]);
        }

        table.to_string()
    }

    /// One row per envelope stage of a score table.
    pub fn format_stage_summaries(&self, summaries: &[StageSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Envelope", "Stage", "Tests", "Targets", "Rate", "Collisions"]));

        for summary in summaries {
            let targets = Cell::new(summary.targets).set_alignment(CellAlignment::Right);
            let targets = if self.use_colors && summary.targets > 0 {
                targets.fg(Color::Green)
            } else {
                targets
            };
            let collisions = Cell::new(summary.collisions).set_alignment(CellAlignment::Right);
            let collisions = if self.use_colors && summary.collisions > 0 {
                collisions.fg(Color::Red)
            } else {
                collisions
            };
            table.add_row(vec![
                Cell::new(summary.envelope_id).set_alignment(CellAlignment::Right),
                Cell::new(summary.stage.to_string()),
                Cell::new(summary.tests).set_alignment(CellAlignment::Right),
                targets,
                Cell::new(format!("{:.1}%", summary.target_rate * 100.0))
                    .set_alignment(CellAlignment::Right),
                collisions,
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn numeric(value: f64) -> Cell {
    Cell::new(format!("{value}")).set_alignment(CellAlignment::Right)
}

fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

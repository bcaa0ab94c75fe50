//! Settings for a campaign and the scenarios it runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::intersection::{Approach, IntersectionLayout, Route, Turn, VehicleType};
use super::target::{CampaignMode, Target};

/// Main configuration structure for dino
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Budget, seed and target of the campaign
    #[serde(default)]
    pub campaign: CampaignConfig,

    /// Scenario construction and metric constants
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Tuning for the built-in stage explorers
    #[serde(default)]
    pub explorers: ExplorerConfig,

    /// YAML file with the parameter space definition
    #[serde(default = "default_parameter_space")]
    pub parameter_space: PathBuf,

    /// Output table location
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_parameter_space() -> PathBuf {
    PathBuf::from("scenario_config/cross-gamma-params.yaml")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            campaign: CampaignConfig::default(),
            scenario: ScenarioConfig::default(),
            explorers: ExplorerConfig::default(),
            parameter_space: default_parameter_space(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Campaign configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CampaignConfig {
    /// Total number of tests the campaign may spend
    #[serde(default = "default_total_tests")]
    pub total_tests: usize,

    /// Boundary-following steps per envelope
    #[serde(default = "default_boundary_samples")]
    pub boundary_samples: usize,

    /// Seed of the campaign random source
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Behavior whose envelope is searched for
    #[serde(default = "default_target")]
    pub target: Target,

    /// Envelope search or Monte Carlo sampling
    #[serde(default)]
    pub mode: CampaignMode,
}

const fn default_total_tests() -> usize {
    10_000
}

const fn default_boundary_samples() -> usize {
    50
}

const fn default_seed() -> u64 {
    4827
}

const fn default_target() -> Target {
    Target::SideMove
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            total_tests: default_total_tests(),
            boundary_samples: default_boundary_samples(),
            seed: default_seed(),
            target: default_target(),
            mode: CampaignMode::default(),
        }
    }
}

/// Scenario configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScenarioConfig {
    /// Simulator state restored at the start of every run
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Vehicle id of the DUT
    #[serde(default = "default_dut_id")]
    pub dut_id: String,

    /// Driver model of the DUT
    #[serde(default = "default_dut_type")]
    pub dut_type: VehicleType,

    /// Route the DUT takes through the junction
    #[serde(default = "default_route")]
    pub route: Route,

    /// Staging route vehicles are spawned on before relocation
    #[serde(default = "default_warmup_route")]
    pub warmup_route: String,

    /// Staging lane the DUT is spawned on, clear of background traffic
    #[serde(default = "default_dut_staging_lane")]
    pub dut_staging_lane: usize,

    /// Length of the incoming turn lanes in metres
    #[serde(default = "default_turn_lane_length")]
    pub turn_lane_length: f64,

    /// Distance from the lane end to the first queue slot
    #[serde(default = "default_queue_head_offset")]
    pub queue_head_offset: f64,

    /// Distance between consecutive queue slots
    #[serde(default = "default_vehicle_spacing")]
    pub vehicle_spacing: f64,

    /// Background vehicles per incoming lane
    #[serde(default = "default_traffic_slots")]
    pub traffic_slots: u8,

    /// Incoming lane index the DUT starts on
    #[serde(default = "default_dut_lane_index")]
    pub dut_lane_index: u8,

    /// Distance from the lane end to the DUT start position
    #[serde(default = "default_dut_setback")]
    pub dut_setback: f64,

    /// Lane-change mode restored after placement
    #[serde(default = "default_lane_change_mode")]
    pub default_lane_change_mode: i32,

    /// Speed mode applied to aggressive drivers every tick
    #[serde(default = "default_aggressive_speed_mode")]
    pub aggressive_speed_mode: Option<i32>,

    /// Deceleration regarded as comfortable (m/s^2)
    #[serde(default = "default_comfortable_decel")]
    pub comfortable_decel: f64,

    /// Emergency deceleration (m/s^2)
    #[serde(default = "default_emergency_decel")]
    pub emergency_decel: f64,

    /// Distance past the junction on the egress lane that ends the run
    #[serde(default = "default_exit_offset")]
    pub exit_offset: f64,

    /// Feature holding the scenario start time
    #[serde(default = "default_start_time_feature")]
    pub start_time_feature: String,

    /// Feature holding the DUT initial speed in km/h
    #[serde(default = "default_dut_speed_feature")]
    pub dut_speed_feature: String,

    /// Side-move behavior of background traffic
    #[serde(default)]
    pub side_move: SideMoveConfig,

    /// Lane roles of the intersection
    #[serde(default)]
    pub layout: IntersectionLayout,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("temp/init-state.xml")
}

fn default_dut_id() -> String {
    "dut".to_string()
}

const fn default_dut_type() -> VehicleType {
    VehicleType::Aggressive
}

const fn default_route() -> Route {
    Route::new(Approach::Eb, Turn::Left)
}

fn default_warmup_route() -> String {
    "warmup".to_string()
}

const fn default_dut_staging_lane() -> usize {
    60
}

const fn default_turn_lane_length() -> f64 {
    200.0
}

const fn default_queue_head_offset() -> f64 {
    20.0
}

const fn default_vehicle_spacing() -> f64 {
    7.0
}

const fn default_traffic_slots() -> u8 {
    5
}

const fn default_dut_lane_index() -> u8 {
    1
}

const fn default_dut_setback() -> f64 {
    // 20 m behind the fifth queue slot: 20 + 5 * 7 + 2 + 20
    77.0
}

const fn default_lane_change_mode() -> i32 {
    1621
}

#[allow(clippy::unnecessary_wraps)]
const fn default_aggressive_speed_mode() -> Option<i32> {
    Some(7)
}

const fn default_comfortable_decel() -> f64 {
    3.0
}

const fn default_emergency_decel() -> f64 {
    9.0
}

const fn default_exit_offset() -> f64 {
    20.0
}

fn default_start_time_feature() -> String {
    "time0".to_string()
}

fn default_dut_speed_feature() -> String {
    "dut_s0".to_string()
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            dut_id: default_dut_id(),
            dut_type: default_dut_type(),
            route: default_route(),
            warmup_route: default_warmup_route(),
            dut_staging_lane: default_dut_staging_lane(),
            turn_lane_length: default_turn_lane_length(),
            queue_head_offset: default_queue_head_offset(),
            vehicle_spacing: default_vehicle_spacing(),
            traffic_slots: default_traffic_slots(),
            dut_lane_index: default_dut_lane_index(),
            dut_setback: default_dut_setback(),
            default_lane_change_mode: default_lane_change_mode(),
            aggressive_speed_mode: default_aggressive_speed_mode(),
            comfortable_decel: default_comfortable_decel(),
            emergency_decel: default_emergency_decel(),
            exit_offset: default_exit_offset(),
            start_time_feature: default_start_time_feature(),
            dut_speed_feature: default_dut_speed_feature(),
            side_move: SideMoveConfig::default(),
            layout: IntersectionLayout::default(),
        }
    }
}

/// Side-move behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SideMoveConfig {
    /// Halted vehicles needed on a lane before it counts as a queue
    #[serde(default = "default_min_halted")]
    pub min_halted: usize,

    /// Nearest distance to the lane end a candidate may be at (exclusive)
    #[serde(default = "default_band_min")]
    pub band_min: f64,

    /// Farthest distance to the lane end a candidate may be at (exclusive)
    #[serde(default = "default_band_max")]
    pub band_max: f64,

    /// How far ahead of its position a side-moving vehicle is placed
    #[serde(default = "default_relocation_offset")]
    pub relocation_offset: f64,
}

const fn default_min_halted() -> usize {
    2
}

const fn default_band_min() -> f64 {
    3.0
}

const fn default_band_max() -> f64 {
    12.0
}

const fn default_relocation_offset() -> f64 {
    8.0
}

impl Default for SideMoveConfig {
    fn default() -> Self {
        Self {
            min_halted: default_min_halted(),
            band_min: default_band_min(),
            band_max: default_band_max(),
            relocation_offset: default_relocation_offset(),
        }
    }
}

/// Built-in explorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExplorerConfig {
    /// Scramble the Halton sequence with a seeded shift
    #[serde(default = "default_true")]
    pub scramble: bool,

    /// First outward step of the surface finder (unit-cube distance)
    #[serde(default = "default_surface_initial_step")]
    pub surface_initial_step: f64,

    /// Bracket width at which the surface finder stops bisecting
    #[serde(default = "default_surface_tolerance")]
    pub surface_tolerance: f64,

    /// Tangential step of the boundary follower
    #[serde(default = "default_boundary_step")]
    pub boundary_step: f64,

    /// Normal correction of the boundary follower per sample
    #[serde(default = "default_boundary_adherence")]
    pub boundary_adherence: f64,
}

const fn default_true() -> bool {
    true
}

const fn default_surface_initial_step() -> f64 {
    0.02
}

const fn default_surface_tolerance() -> f64 {
    0.005
}

const fn default_boundary_step() -> f64 {
    0.03
}

const fn default_boundary_adherence() -> f64 {
    0.015
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            scramble: default_true(),
            surface_initial_step: default_surface_initial_step(),
            surface_tolerance: default_surface_tolerance(),
            boundary_step: default_boundary_step(),
            boundary_adherence: default_boundary_adherence(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutputConfig {
    /// Directory the parameter and score tables are written to
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("temp")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

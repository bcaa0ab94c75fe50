//! Domain models for envelope exploration.

pub mod config;
pub mod envelope;
pub mod geometry;
pub mod intersection;
pub mod parameter_space;
pub mod score;
pub mod table;
pub mod target;

pub use config::{
    CampaignConfig, Config, ExplorerConfig, LoggingConfig, OutputConfig, ScenarioConfig,
    SideMoveConfig,
};
pub use envelope::{Envelope, Stage, StageHistory, StageRun};
pub use geometry::{footprint_distance, orthonormal_frame, VehiclePose};
pub use intersection::{
    Approach, IntersectionLayout, LaneRole, LaneSpec, Route, Turn, VehicleRegistry, VehicleRole,
    VehicleTag, VehicleType,
};
pub use parameter_space::{Feature, ParameterSpace, ParameterVector};
pub use score::{CollisionEvent, CollisionRole, ScoreVector, SIDE_MOVE_NEVER};
pub use table::{FlatTables, ParamRow, ScoreRow, TableName};
pub use target::{CampaignMode, Target};

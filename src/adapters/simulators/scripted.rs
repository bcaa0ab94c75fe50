//! Scripted simulator for tests and dry runs.
//!
//! Replays a fixed list of frames instead of simulating traffic. Each frame
//! describes the vehicles, lane counters, light phase and collisions seen
//! after one tick. Commands are accepted and recorded but never change what
//! the script reports.
//!
//! By default the script starts playing on the tick after the one that
//! inserts the first spawned vehicle, so frame 0 is the first running tick
//! of a scenario. Scripts built with [`ScriptedSimulator::from_frames`]
//! play from the very first tick.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::geometry::Point;
use crate::domain::ports::{CollisionReport, Simulator, SpawnRequest, VehicleState};

/// Speed below which a vehicle counts as halted.
const HALTING_SPEED: f64 = 0.1;

/// When the first frame is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStart {
    /// First tick after the spawned vehicles were inserted
    #[default]
    AfterPlacement,
    /// First tick after a reset
    Immediately,
}

/// One vehicle as seen in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedVehicle {
    /// Vehicle id
    pub id: String,
    /// Simulator type id, `Car` when omitted
    #[serde(default = "default_type_id")]
    pub type_id: String,
    /// Lane the vehicle is on
    pub lane: String,
    /// Front-bumper distance from the start of the lane
    pub lane_position: f64,
    /// Front-bumper centre, `(0, 0)` when omitted
    #[serde(default)]
    pub position: Point,
    /// Heading in degrees, 0 = north
    #[serde(default)]
    pub angle: f64,
    /// Metres per second
    #[serde(default)]
    pub speed: f64,
    /// Metres per second squared
    #[serde(default)]
    pub acceleration: f64,
    /// Metres
    #[serde(default = "default_length")]
    pub length: f64,
    /// Metres
    #[serde(default = "default_width")]
    pub width: f64,
}

fn default_type_id() -> String {
    "Car".to_string()
}

const fn default_length() -> f64 {
    5.0
}

const fn default_width() -> f64 {
    1.8
}

impl ScriptedVehicle {
    /// A vehicle heading north with its front at `(0, lane_position)`.
    pub fn new(
        id: impl Into<String>,
        type_id: impl Into<String>,
        lane: impl Into<String>,
        lane_position: f64,
        speed: f64,
    ) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            lane: lane.into(),
            lane_position,
            position: (0.0, lane_position),
            angle: 0.0,
            speed,
            acceleration: 0.0,
            length: default_length(),
            width: default_width(),
        }
    }

    /// Place the front bumper at `(x, y)`.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = (x, y);
        self
    }

    /// Set the reported acceleration.
    pub fn with_acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = acceleration;
        self
    }

    fn state(&self) -> VehicleState {
        VehicleState {
            type_id: self.type_id.clone(),
            lane: self.lane.clone(),
            lane_position: self.lane_position,
            position: self.position,
            angle: self.angle,
            speed: self.speed,
            acceleration: self.acceleration,
            length: self.length,
            width: self.width,
        }
    }
}

/// Lane counters that override what the vehicle list implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedLane {
    /// Lane id
    pub id: String,
    /// Halted vehicles reported for the lane
    #[serde(default)]
    pub halting: Option<usize>,
    /// Lane length reported for the lane
    #[serde(default)]
    pub length: Option<f64>,
}

impl ScriptedLane {
    /// Lane reporting `halting` halted vehicles.
    pub fn halting(id: impl Into<String>, halting: usize) -> Self {
        Self {
            id: id.into(),
            halting: Some(halting),
            length: None,
        }
    }
}

/// What the simulator reports after one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFrame {
    /// Vehicles in the network
    #[serde(default)]
    pub vehicles: Vec<ScriptedVehicle>,
    /// Lane counter overrides
    #[serde(default)]
    pub lanes: Vec<ScriptedLane>,
    /// Collisions that happened during the tick
    #[serde(default)]
    pub collisions: Vec<CollisionReport>,
    /// Light phase; the scenario default when unset
    #[serde(default)]
    pub phase: Option<String>,
    /// Defaults to the vehicles in this frame plus the frames still to come
    #[serde(default)]
    pub expected_vehicles: Option<usize>,
}

impl ScriptedFrame {
    fn vehicle(&self, id: &str) -> Option<&ScriptedVehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    fn lane(&self, id: &str) -> Option<&ScriptedLane> {
        self.lanes.iter().find(|l| l.id == id)
    }
}

/// A complete script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedScenario {
    /// Seconds per tick
    #[serde(default = "default_step_length")]
    pub step_length: f64,
    /// Simulated time right after a reset
    #[serde(default)]
    pub start_time: f64,
    /// Length reported for lanes without an override
    #[serde(default = "default_lane_length")]
    pub lane_length: f64,
    /// Light phase for frames that leave it unset
    #[serde(default = "default_phase")]
    pub phase: String,
    /// When the first frame plays
    #[serde(default)]
    pub start: ScriptStart,
    /// Frames in playback order
    #[serde(default)]
    pub frames: Vec<ScriptedFrame>,
}

const fn default_step_length() -> f64 {
    1.0
}

const fn default_lane_length() -> f64 {
    200.0
}

fn default_phase() -> String {
    "G".repeat(12)
}

impl Default for ScriptedScenario {
    fn default() -> Self {
        Self {
            step_length: default_step_length(),
            start_time: 0.0,
            lane_length: default_lane_length(),
            phase: default_phase(),
            start: ScriptStart::default(),
            frames: Vec::new(),
        }
    }
}

impl ScriptedScenario {
    /// Parse a script from YAML (or JSON).
    pub fn from_yaml_str(yaml: &str) -> DomainResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        if !(scenario.step_length > 0.0) {
            return Err(DomainError::config("step_length must be positive"));
        }
        Ok(scenario)
    }

    /// Parse a script file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DomainError::config(format!("cannot read script {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }
}

/// Simulator that replays a [`ScriptedScenario`].
#[derive(Debug, Clone)]
pub struct ScriptedSimulator {
    scenario: ScriptedScenario,
    tick: u64,
    origin: Option<u64>,
    spawned: Vec<String>,
    spawns: Vec<SpawnRequest>,
    relocations: Vec<(String, String, f64)>,
    routes: Vec<(String, String)>,
    lane_change_modes: Vec<(String, i32)>,
    speed_modes: Vec<(String, i32)>,
    resets: usize,
}

impl ScriptedSimulator {
    /// Simulator replaying `scenario`.
    pub fn new(scenario: ScriptedScenario) -> Self {
        let origin = match scenario.start {
            ScriptStart::Immediately => Some(0),
            ScriptStart::AfterPlacement => None,
        };
        Self {
            scenario,
            tick: 0,
            origin,
            spawned: Vec::new(),
            spawns: Vec::new(),
            relocations: Vec::new(),
            routes: Vec::new(),
            lane_change_modes: Vec::new(),
            speed_modes: Vec::new(),
            resets: 0,
        }
    }

    /// Script that plays from the first tick with default settings.
    pub fn from_frames(frames: Vec<ScriptedFrame>) -> Self {
        Self::new(ScriptedScenario {
            start: ScriptStart::Immediately,
            frames,
            ..ScriptedScenario::default()
        })
    }

    /// The script being replayed.
    pub fn scenario(&self) -> &ScriptedScenario {
        &self.scenario
    }

    /// Ticks since the last reset.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of snapshot resets so far.
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Every spawn request since the last reset.
    pub fn spawns(&self) -> &[SpawnRequest] {
        &self.spawns
    }

    /// `(vehicle, lane, position)` of every relocation since the last reset.
    pub fn relocations(&self) -> &[(String, String, f64)] {
        &self.relocations
    }

    /// `(vehicle, route)` of every route change since the last reset.
    pub fn routes(&self) -> &[(String, String)] {
        &self.routes
    }

    /// `(vehicle, mode)` of every lane-change mode change since the last reset.
    pub fn lane_change_modes(&self) -> &[(String, i32)] {
        &self.lane_change_modes
    }

    /// `(vehicle, mode)` of every speed mode change since the last reset.
    pub fn speed_modes(&self) -> &[(String, i32)] {
        &self.speed_modes
    }

    fn frame_index(&self) -> Option<usize> {
        let origin = self.origin?;
        let index = self.tick.checked_sub(origin + 1)?;
        usize::try_from(index).ok()
    }

    fn frame(&self) -> Option<&ScriptedFrame> {
        self.frame_index()
            .and_then(|index| self.scenario.frames.get(index))
    }

    fn finished(&self) -> bool {
        self.frame_index()
            .is_some_and(|index| index >= self.scenario.frames.len())
    }

    fn exists(&self, id: &str) -> bool {
        match self.frame() {
            Some(frame) => frame.vehicle(id).is_some(),
            None => !self.finished() && self.spawned.iter().any(|s| s == id),
        }
    }

    fn require(&self, id: &str) -> DomainResult<()> {
        if self.exists(id) {
            Ok(())
        } else {
            Err(DomainError::protocol(format!(
                "vehicle '{id}' is not known at tick {}",
                self.tick
            )))
        }
    }
}

#[async_trait]
impl Simulator for ScriptedSimulator {
    async fn reset_to_snapshot(&mut self, _path: &Path) -> DomainResult<()> {
        let scenario = std::mem::take(&mut self.scenario);
        let resets = self.resets + 1;
        *self = Self::new(scenario);
        self.resets = resets;
        Ok(())
    }

    async fn advance_tick(&mut self) -> DomainResult<()> {
        self.tick += 1;
        Ok(())
    }

    async fn time(&mut self) -> DomainResult<f64> {
        Ok(self.scenario.start_time + self.tick as f64 * self.scenario.step_length)
    }

    async fn min_expected_vehicles(&mut self) -> DomainResult<usize> {
        if self.finished() {
            return Ok(0);
        }
        match (self.frame(), self.frame_index()) {
            (Some(frame), Some(index)) => Ok(frame.expected_vehicles.unwrap_or_else(|| {
                frame.vehicles.len() + (self.scenario.frames.len() - index - 1)
            })),
            _ => Ok(self.spawned.len().max(1)),
        }
    }

    async fn spawn_vehicle(&mut self, request: &SpawnRequest) -> DomainResult<()> {
        if self.spawned.contains(&request.id) {
            return Err(DomainError::protocol(format!(
                "vehicle '{}' already exists",
                request.id
            )));
        }
        if self.origin.is_none() {
            self.origin = Some(self.tick + 1);
        }
        self.spawned.push(request.id.clone());
        self.spawns.push(request.clone());
        Ok(())
    }

    async fn relocate_vehicle(&mut self, id: &str, lane: &str, position: f64) -> DomainResult<()> {
        self.require(id)?;
        self.relocations
            .push((id.to_string(), lane.to_string(), position));
        Ok(())
    }

    async fn set_route(&mut self, id: &str, route: &str) -> DomainResult<()> {
        self.require(id)?;
        self.routes.push((id.to_string(), route.to_string()));
        Ok(())
    }

    async fn set_lane_change_mode(&mut self, id: &str, mode: i32) -> DomainResult<()> {
        self.require(id)?;
        self.lane_change_modes.push((id.to_string(), mode));
        Ok(())
    }

    async fn set_speed_mode(&mut self, id: &str, mode: i32) -> DomainResult<()> {
        self.require(id)?;
        self.speed_modes.push((id.to_string(), mode));
        Ok(())
    }

    async fn collisions(&mut self) -> DomainResult<Vec<CollisionReport>> {
        Ok(self
            .frame()
            .map(|frame| frame.collisions.clone())
            .unwrap_or_default())
    }

    async fn vehicle_exists(&mut self, id: &str) -> DomainResult<bool> {
        Ok(self.exists(id))
    }

    async fn vehicle_state(&mut self, id: &str) -> DomainResult<VehicleState> {
        self.frame()
            .and_then(|frame| frame.vehicle(id))
            .map(ScriptedVehicle::state)
            .ok_or_else(|| {
                DomainError::protocol(format!(
                    "no state for vehicle '{id}' at tick {}",
                    self.tick
                ))
            })
    }

    async fn lane_vehicles(&mut self, lane: &str) -> DomainResult<Vec<String>> {
        Ok(self
            .frame()
            .map(|frame| {
                frame
                    .vehicles
                    .iter()
                    .filter(|v| v.lane == lane)
                    .map(|v| v.id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn lane_halting_count(&mut self, lane: &str) -> DomainResult<usize> {
        let Some(frame) = self.frame() else {
            return Ok(0);
        };
        if let Some(halting) = frame.lane(lane).and_then(|l| l.halting) {
            return Ok(halting);
        }
        Ok(frame
            .vehicles
            .iter()
            .filter(|v| v.lane == lane && v.speed < HALTING_SPEED)
            .count())
    }

    async fn lane_length(&mut self, lane: &str) -> DomainResult<f64> {
        Ok(self
            .frame()
            .and_then(|frame| frame.lane(lane))
            .and_then(|l| l.length)
            .unwrap_or(self.scenario.lane_length))
    }

    async fn traffic_light_state(&mut self, _tls_id: &str) -> DomainResult<String> {
        Ok(self
            .frame()
            .and_then(|frame| frame.phase.clone())
            .unwrap_or_else(|| self.scenario.phase.clone()))
    }
}

//! Traffic simulator port and the records it exchanges.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::errors::DomainResult;
use crate::domain::models::geometry::{Point, VehiclePose};

/// A collision reported by the simulator for the last tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionReport {
    /// Id of the striking vehicle
    pub collider: String,
    /// Id of the struck vehicle
    pub victim: String,
    /// Type id of the striking vehicle
    pub collider_type: String,
    /// Type id of the struck vehicle
    pub victim_type: String,
    /// Speed of the striking vehicle, m/s
    pub collider_speed: f64,
    /// Speed of the struck vehicle, m/s
    pub victim_speed: f64,
    /// Lane of the impact
    pub lane: String,
    /// World coordinates of the impact
    pub position: Point,
}

/// Snapshot of one vehicle after the last tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Simulator vehicle-type id
    pub type_id: String,
    /// Lane the vehicle is on
    pub lane: String,
    /// Distance of the front bumper from the start of the lane
    pub lane_position: f64,
    /// Front-bumper centre in world coordinates
    pub position: Point,
    /// Heading in degrees, 0 = north, clockwise
    pub angle: f64,
    /// Metres per second
    pub speed: f64,
    /// Metres per second squared, negative when braking
    pub acceleration: f64,
    /// Metres
    #[serde(default = "default_length")]
    pub length: f64,
    /// Metres
    #[serde(default = "default_width")]
    pub width: f64,
}

const fn default_length() -> f64 {
    5.0
}

const fn default_width() -> f64 {
    1.8
}

impl VehicleState {
    /// Pose used for footprint distances.
    pub fn pose(&self) -> VehiclePose {
        VehiclePose {
            front: self.position,
            heading_deg: self.angle,
            length: self.length,
            width: self.width,
        }
    }
}

/// Request to insert a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Vehicle id, unique for the run
    pub id: String,
    /// Simulator vehicle-type id
    pub type_id: String,
    /// Route the vehicle departs on
    pub route: String,
    /// Departure lane index on the first edge of the route
    pub depart_lane: usize,
    /// Metres per second
    pub depart_speed: f64,
}

/// Port to the traffic simulator.
///
/// One connection is a process-wide exclusive resource: callers hold it by
/// `&mut` and await every call in sequence. Any error is a protocol failure
/// for the scenario in progress.
#[async_trait]
pub trait Simulator: Send {
    /// Restore the full simulation state from a saved snapshot
    async fn reset_to_snapshot(&mut self, path: &Path) -> DomainResult<()>;

    /// Advance the simulation by one tick
    async fn advance_tick(&mut self) -> DomainResult<()>;

    /// Current simulated time in seconds
    async fn time(&mut self) -> DomainResult<f64>;

    /// Vehicles still running or waiting to be inserted
    async fn min_expected_vehicles(&mut self) -> DomainResult<usize>;

    /// Insert a vehicle; it appears in the network on the next tick
    async fn spawn_vehicle(&mut self, request: &SpawnRequest) -> DomainResult<()>;

    /// Move a vehicle onto `lane` at lane position `position`
    async fn relocate_vehicle(&mut self, id: &str, lane: &str, position: f64) -> DomainResult<()>;

    /// Replace the route of a vehicle
    async fn set_route(&mut self, id: &str, route: &str) -> DomainResult<()>;

    /// Set the lane-change mode bit field of a vehicle
    async fn set_lane_change_mode(&mut self, id: &str, mode: i32) -> DomainResult<()>;

    /// Set the speed mode bit field of a vehicle
    async fn set_speed_mode(&mut self, id: &str, mode: i32) -> DomainResult<()>;

    /// Collisions that happened during the last tick
    async fn collisions(&mut self) -> DomainResult<Vec<CollisionReport>>;

    /// Whether the vehicle is currently in the network
    async fn vehicle_exists(&mut self, id: &str) -> DomainResult<bool>;

    /// Full state of a vehicle; an unknown id is an error
    async fn vehicle_state(&mut self, id: &str) -> DomainResult<VehicleState>;

    /// Ids of vehicles on a lane after the last tick
    async fn lane_vehicles(&mut self, lane: &str) -> DomainResult<Vec<String>>;

    /// Number of halted vehicles on a lane
    async fn lane_halting_count(&mut self, lane: &str) -> DomainResult<usize>;

    /// Length of a lane in metres
    async fn lane_length(&mut self, lane: &str) -> DomainResult<f64>;

    /// Phase string of a traffic light, one character per controlled link
    async fn traffic_light_state(&mut self, tls_id: &str) -> DomainResult<String>;

    /// Current speed of a vehicle
    async fn speed(&mut self, id: &str) -> DomainResult<f64> {
        Ok(self.vehicle_state(id).await?.speed)
    }

    /// Lane a vehicle is on
    async fn lane(&mut self, id: &str) -> DomainResult<String> {
        Ok(self.vehicle_state(id).await?.lane)
    }

    /// Type id of a vehicle
    async fn vehicle_type(&mut self, id: &str) -> DomainResult<String> {
        Ok(self.vehicle_state(id).await?.type_id)
    }
}

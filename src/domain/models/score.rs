//! Score vector produced by one scenario run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side-move time recorded when the DUT never side-moved.
pub const SIDE_MOVE_NEVER: f64 = -1.0;

/// Which party of a collision the DUT was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionRole {
    /// The DUT struck the other vehicle
    Collider,
    /// The other vehicle struck the DUT
    Victim,
}

impl fmt::Display for CollisionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collider => write!(f, "collider"),
            Self::Victim => write!(f, "victim"),
        }
    }
}

/// A collision involving the DUT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Seconds since scenario start
    pub time: f64,
    /// World coordinates of the impact
    pub position: (f64, f64),
    /// Lane the collision was reported on
    pub lane: String,
    /// Whether the DUT struck or was struck
    pub dut_role: CollisionRole,
    /// DUT speed at impact, m/s
    pub dut_speed: f64,
    /// Simulator type id of the other vehicle
    pub other_type: String,
    /// Other vehicle's speed at impact, m/s
    pub other_speed: f64,
}

/// Metrics gathered over one scenario run.
///
/// Running minima and maxima are `None` until the condition that feeds them
/// has been observed at least once. Times are relative to the tick on which
/// the scenario started running, never absolute simulator time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    /// Every collision involving the DUT, in tick order
    pub collisions: Vec<CollisionEvent>,
    /// DUT speed on the first junction tick
    pub speed_on_enter: Option<f64>,
    /// Strongest deceleration observed, m/s²
    pub braking_force: Option<f64>,
    /// `braking_force` on the comfortable/emergency scale
    pub braking_force_norm: Option<f64>,
    /// Minimum gap to the lead vehicle in the DUT's lane
    pub dtc_front: Option<f64>,
    /// Minimum polygon distance to approach-zone or junction vehicles while approaching
    pub dtc_approach: Option<f64>,
    /// Minimum polygon distance to junction vehicles while moving inside the junction
    pub dtc_inter: Option<f64>,
    /// Minimum time to collision with the lead vehicle while closing
    pub ttc_front: Option<f64>,
    /// Signal phase on the first junction tick
    pub tl_state_on_enter: Option<String>,
    /// Vehicles already inside the junction when the DUT entered
    pub foes_in_inter_on_enter: Vec<String>,
    /// Time of the first junction tick
    pub time_on_enter: Option<f64>,
    /// Time of the last tick of the run
    pub time_at_end: f64,
    /// Transitions from moving to standing still
    pub n_stops: u32,
    /// First side-move time, or [`SIDE_MOVE_NEVER`]
    pub side_move: f64,
    /// The DUT's movement showed red when it entered the junction
    pub run_red_light: bool,
}

impl Default for ScoreVector {
    fn default() -> Self {
        Self {
            collisions: Vec::new(),
            speed_on_enter: None,
            braking_force: None,
            braking_force_norm: None,
            dtc_front: None,
            dtc_approach: None,
            dtc_inter: None,
            ttc_front: None,
            tl_state_on_enter: None,
            foes_in_inter_on_enter: Vec::new(),
            time_on_enter: None,
            time_at_end: 0.0,
            n_stops: 0,
            side_move: SIDE_MOVE_NEVER,
            run_red_light: false,
        }
    }
}

impl ScoreVector {
    /// Whether the DUT side-moved at least once.
    pub fn side_moved(&self) -> bool {
        self.side_move != SIDE_MOVE_NEVER
    }

    /// Number of collisions involving the DUT.
    pub fn n_collisions(&self) -> usize {
        self.collisions.len()
    }

    /// Whether the DUT reached the junction.
    pub fn entered_junction(&self) -> bool {
        self.time_on_enter.is_some()
    }
}

/// Fold `value` into a running minimum.
pub(crate) fn keep_min(slot: &mut Option<f64>, value: f64) {
    if slot.map_or(true, |current| value < current) {
        *slot = Some(value);
    }
}

/// Fold `value` into a running maximum.
pub(crate) fn keep_max(slot: &mut Option<f64>, value: f64) {
    if slot.map_or(true, |current| value > current) {
        *slot = Some(value);
    }
}

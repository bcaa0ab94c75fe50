//! Per-tick metric trackers for the DUT.
//!
//! Each tracker is a small pure state machine fed one observation per tick.
//! The scenario executor owns one of each and copies their results into the
//! score vector when the run completes.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::score::{keep_max, keep_min};

/// Counts transitions from a nonzero speed to exactly zero.
#[derive(Debug, Clone, Default)]
pub struct StopCounter {
    last_speed: Option<f64>,
    stops: u32,
}

impl StopCounter {
    /// Counter with no observation yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the speed of one tick.
    pub fn observe(&mut self, speed: f64) {
        if let Some(last) = self.last_speed {
            if last != 0.0 && speed == 0.0 {
                self.stops += 1;
            }
        }
        self.last_speed = Some(speed);
    }

    /// Stops counted so far.
    pub fn stops(&self) -> u32 {
        self.stops
    }
}

/// Map a braking force onto the comfort/emergency scale: 1.0 is the
/// comfortable limit, 2.0 is the emergency limit.
pub fn normalize_braking(force: f64, comfortable: f64, emergency: f64) -> f64 {
    if force <= comfortable {
        force / comfortable
    } else {
        1.0 + (force - comfortable) / (emergency - comfortable)
    }
}

/// Running maximum of the DUT's deceleration.
#[derive(Debug, Clone)]
pub struct BrakingTracker {
    comfortable: f64,
    emergency: f64,
    max_force: Option<f64>,
}

impl BrakingTracker {
    /// Tracker normalizing against the `comfortable` and `emergency` limits.
    pub fn new(comfortable: f64, emergency: f64) -> Self {
        Self {
            comfortable,
            emergency,
            max_force: None,
        }
    }

    /// Feed the acceleration of one tick; only negative values count.
    pub fn observe(&mut self, acceleration: f64) {
        if acceleration < 0.0 {
            keep_max(&mut self.max_force, -acceleration);
        }
    }

    /// Strongest deceleration so far.
    pub fn max_force(&self) -> Option<f64> {
        self.max_force
    }

    /// Strongest deceleration on the comfort/emergency scale.
    pub fn normalized(&self) -> Option<f64> {
        self.max_force
            .map(|force| normalize_braking(force, self.comfortable, self.emergency))
    }
}

/// Whether the link at `movement_index` shows red in a signal phase string.
pub fn runs_red_light(phase: &str, movement_index: usize) -> DomainResult<bool> {
    let signal = phase.chars().nth(movement_index).ok_or_else(|| {
        DomainError::protocol(format!(
            "signal phase '{phase}' has no link {movement_index}"
        ))
    })?;
    Ok(matches!(signal, 'r' | 'R'))
}

/// Nearest vehicle strictly ahead of the DUT on its lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadVehicle {
    /// Lane-position offset between the two front bumpers
    pub offset: f64,
    /// Length of the lead vehicle
    pub length: f64,
    /// Speed of the lead vehicle
    pub speed: f64,
}

impl LeadVehicle {
    /// Bumper-to-bumper gap.
    pub fn gap(&self) -> f64 {
        self.offset - self.length
    }
}

/// Running minima of the distance and time to collision with the lead vehicle.
#[derive(Debug, Clone, Default)]
pub struct LeadProximity {
    min_distance: Option<f64>,
    min_ttc: Option<f64>,
}

impl LeadProximity {
    /// Tracker with no observation yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the DUT speed and its lead vehicle for one tick.
    pub fn observe(&mut self, dut_speed: f64, lead: &LeadVehicle) {
        let gap = lead.gap();
        keep_min(&mut self.min_distance, gap);

        let closing = dut_speed - lead.speed;
        if closing > 0.0 {
            keep_min(&mut self.min_ttc, gap.max(0.0) / closing);
        }
    }

    /// Smallest bumper-to-bumper gap so far.
    pub fn min_distance(&self) -> Option<f64> {
        self.min_distance
    }

    /// Smallest time to collision so far, only counted while closing.
    pub fn min_ttc(&self) -> Option<f64> {
        self.min_ttc
    }
}

/// Pick the lead vehicle from `(offset, length, speed)` candidates.
pub fn nearest_ahead(candidates: impl IntoIterator<Item = LeadVehicle>) -> Option<LeadVehicle> {
    candidates
        .into_iter()
        .filter(|c| c.offset > 0.0)
        .min_by(|a, b| a.offset.total_cmp(&b.offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_counter_counts_falling_edges() {
        let mut counter = StopCounter::new();
        for speed in [5.0, 5.0, 0.0, 0.0, 3.0, 0.0] {
            counter.observe(speed);
        }
        assert_eq!(counter.stops(), 2);
    }

    #[test]
    fn test_stop_counter_ignores_initial_standstill() {
        let mut counter = StopCounter::new();
        for speed in [0.0, 0.0, 1.0] {
            counter.observe(speed);
        }
        assert_eq!(counter.stops(), 0);
    }

    #[test]
    fn test_braking_normalization() {
        assert!((normalize_braking(3.0, 3.0, 9.0) - 1.0).abs() < 1e-12);
        assert!((normalize_braking(6.0, 3.0, 9.0) - 1.5).abs() < 1e-12);
        assert!((normalize_braking(1.5, 3.0, 9.0) - 0.5).abs() < 1e-12);
        assert!((normalize_braking(9.0, 3.0, 9.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_braking_tracker_only_counts_deceleration() {
        let mut braking = BrakingTracker::new(3.0, 9.0);
        braking.observe(2.0);
        assert_eq!(braking.max_force(), None);
        assert_eq!(braking.normalized(), None);

        braking.observe(-4.0);
        braking.observe(-6.0);
        braking.observe(-1.0);
        assert_eq!(braking.max_force(), Some(6.0));
        assert!((braking.normalized().unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_red_light_reads_movement_character() {
        let phase = "rrGrrrrrGrrr";
        assert!(runs_red_light(phase, 0).unwrap());
        assert!(runs_red_light(phase, 1).unwrap());
        assert!(!runs_red_light(phase, 2).unwrap());
        assert!(!runs_red_light(phase, 8).unwrap());
        assert!(!runs_red_light("GGgyyy", 3).unwrap());
    }

    #[test]
    fn test_red_light_index_out_of_range() {
        let err = runs_red_light("rG", 5).unwrap_err();
        assert!(matches!(err, DomainError::SimulatorProtocol(_)));
    }

    #[test]
    fn test_lead_proximity() {
        let mut proximity = LeadProximity::new();
        // Lead 20 m ahead, 5 m long, DUT slower: no ttc
        proximity.observe(
            5.0,
            &LeadVehicle {
                offset: 20.0,
                length: 5.0,
                speed: 8.0,
            },
        );
        assert_eq!(proximity.min_distance(), Some(15.0));
        assert_eq!(proximity.min_ttc(), None);

        // Closing at 5 m/s with a 10 m gap
        proximity.observe(
            10.0,
            &LeadVehicle {
                offset: 15.0,
                length: 5.0,
                speed: 5.0,
            },
        );
        assert_eq!(proximity.min_distance(), Some(10.0));
        assert_eq!(proximity.min_ttc(), Some(2.0));
    }

    #[test]
    fn test_nearest_ahead_ignores_followers() {
        let candidates = vec![
            LeadVehicle {
                offset: -7.0,
                length: 5.0,
                speed: 0.0,
            },
            LeadVehicle {
                offset: 30.0,
                length: 5.0,
                speed: 0.0,
            },
            LeadVehicle {
                offset: 12.0,
                length: 4.0,
                speed: 1.0,
            },
        ];
        let lead = nearest_ahead(candidates).unwrap();
        assert_eq!(lead.offset, 12.0);
        assert!(nearest_ahead(Vec::new()).is_none());
    }
}

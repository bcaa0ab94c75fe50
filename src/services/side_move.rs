//! Background-traffic behavior: aggressive drivers squeezing past a queue.
//!
//! A side move has two legs. When an aggressive vehicle sits just behind the
//! head of a halted queue and a neighbouring lane is clear, it is moved into
//! that lane a few metres ahead (leg one) and queued to return to its own
//! lane at the same position on the next tick (leg two). Each tick first
//! drains the returns queued on the previous tick, then queues new ones.

use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::config::SideMoveConfig;
use crate::domain::models::intersection::{IntersectionLayout, VehicleRegistry, VehicleType};
use crate::domain::ports::Simulator;

#[derive(Debug, Clone, PartialEq)]
struct PendingReturn {
    vehicle: String,
    lane: String,
    position: f64,
}

/// Per-run side-move behavior state.
#[derive(Debug, Clone)]
pub struct SideMoveBehavior {
    config: SideMoveConfig,
    aggressive_speed_mode: Option<i32>,
    pending: Vec<PendingReturn>,
}

impl SideMoveBehavior {
    /// No vehicle pending; `aggressive_speed_mode` is applied to aggressive
    /// vehicles on approach lanes every tick when set.
    pub fn new(config: SideMoveConfig, aggressive_speed_mode: Option<i32>) -> Self {
        Self {
            config,
            aggressive_speed_mode,
            pending: Vec::new(),
        }
    }

    /// Vehicles waiting to return to their origin lane on the next tick.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|p| p.vehicle.as_str())
    }

    /// Run one tick of the behavior; returns the vehicles that started a side
    /// move on this tick.
    pub async fn on_tick<S>(
        &mut self,
        sim: &mut S,
        layout: &IntersectionLayout,
        registry: &VehicleRegistry,
    ) -> DomainResult<Vec<String>>
    where
        S: Simulator + ?Sized,
    {
        for ret in std::mem::take(&mut self.pending) {
            if sim.vehicle_exists(&ret.vehicle).await? {
                sim.relocate_vehicle(&ret.vehicle, &ret.lane, ret.position)
                    .await?;
            } else {
                debug!(vehicle = %ret.vehicle, "Side-move vehicle left before returning");
            }
        }

        let mut started = Vec::new();
        for (edge, lanes) in layout.approach_edges() {
            if let Some(mode) = self.aggressive_speed_mode {
                for lane in &lanes {
                    for vehicle in sim.lane_vehicles(&lane.id).await? {
                        if is_aggressive(sim, registry, &vehicle).await? {
                            sim.set_speed_mode(&vehicle, mode).await?;
                        }
                    }
                }
            }

            for lane in &lanes {
                if sim.lane_halting_count(&lane.id).await? < self.config.min_halted {
                    continue;
                }
                let length = sim.lane_length(&lane.id).await?;

                for vehicle in sim.lane_vehicles(&lane.id).await? {
                    let state = sim.vehicle_state(&vehicle).await?;
                    let to_end = length - state.lane_position;
                    if to_end <= self.config.band_min || to_end >= self.config.band_max {
                        continue;
                    }
                    if !is_aggressive(sim, registry, &vehicle).await? {
                        continue;
                    }

                    // Lanes are sorted by index, so the lowest clear neighbour wins.
                    let mut target = None;
                    for other in &lanes {
                        if other.index.abs_diff(lane.index) == 1
                            && sim.lane_halting_count(&other.id).await? == 0
                        {
                            target = Some(other);
                            break;
                        }
                    }
                    let Some(target) = target else {
                        continue;
                    };

                    let position = state.lane_position + self.config.relocation_offset;
                    debug!(
                        vehicle = %vehicle,
                        edge = %edge,
                        from = %lane.id,
                        to = %target.id,
                        position,
                        "Side move"
                    );
                    sim.relocate_vehicle(&vehicle, &target.id, position).await?;
                    self.pending.push(PendingReturn {
                        vehicle: vehicle.clone(),
                        lane: lane.id.clone(),
                        position,
                    });
                    started.push(vehicle);
                }
            }
        }

        Ok(started)
    }
}

async fn is_aggressive<S>(sim: &mut S, registry: &VehicleRegistry, vehicle: &str) -> DomainResult<bool>
where
    S: Simulator + ?Sized,
{
    let vtype = match registry.get(vehicle) {
        Some(tag) => Some(tag.vtype),
        None => VehicleType::from_type_id(&sim.vehicle_type(vehicle).await?),
    };
    Ok(vtype == Some(VehicleType::Aggressive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simulators::scripted::{ScriptedFrame, ScriptedLane, ScriptedSimulator, ScriptedVehicle};
    use crate::domain::models::intersection::{Approach, Route, Turn, VehicleRole, VehicleTag};

    fn vehicle(id: &str, type_id: &str, lane: &str, lane_position: f64, speed: f64) -> ScriptedVehicle {
        ScriptedVehicle::new(id, type_id, lane, lane_position, speed)
    }

    fn queue_frame(halting_neighbour: usize) -> ScriptedFrame {
        ScriptedFrame {
            vehicles: vec![
                vehicle("head", "Car", "1si_1", 195.0, 0.0),
                vehicle("aggr", "AggrCar", "1si_1", 190.0, 0.0),
                vehicle("calm", "Car", "1si_1", 188.0, 0.0),
            ],
            lanes: vec![
                ScriptedLane::halting("1si_1", 3),
                ScriptedLane::halting("1si_0", halting_neighbour),
                ScriptedLane::halting("1si_2", 0),
            ],
            ..ScriptedFrame::default()
        }
    }

    #[tokio::test]
    async fn test_aggressive_vehicle_moves_to_lowest_clear_neighbour() {
        let mut sim = ScriptedSimulator::from_frames(vec![queue_frame(0), ScriptedFrame::default()]);
        sim.advance_tick().await.unwrap();
        let layout = IntersectionLayout::gamma_cross();
        let registry = VehicleRegistry::new();
        let mut behavior = SideMoveBehavior::new(SideMoveConfig::default(), Some(7));

        let started = behavior.on_tick(&mut sim, &layout, &registry).await.unwrap();
        assert_eq!(started, vec!["aggr".to_string()]);
        assert_eq!(
            sim.relocations(),
            &[("aggr".to_string(), "1si_0".to_string(), 198.0)]
        );
        assert_eq!(sim.speed_modes(), &[("aggr".to_string(), 7)]);
        assert_eq!(behavior.pending().collect::<Vec<_>>(), vec!["aggr"]);
    }

    #[tokio::test]
    async fn test_return_leg_runs_on_next_tick() {
        let mut sim = ScriptedSimulator::from_frames(vec![queue_frame(2), queue_frame(2)]);
        sim.advance_tick().await.unwrap();
        let layout = IntersectionLayout::gamma_cross();
        let registry = VehicleRegistry::new();
        let mut behavior = SideMoveBehavior::new(SideMoveConfig::default(), None);

        // Right neighbour is queued, so the left lane is used
        let started = behavior.on_tick(&mut sim, &layout, &registry).await.unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(sim.relocations()[0].1, "1si_2");

        sim.advance_tick().await.unwrap();
        behavior.on_tick(&mut sim, &layout, &registry).await.unwrap();
        assert_eq!(
            sim.relocations()[1],
            ("aggr".to_string(), "1si_1".to_string(), 198.0)
        );
    }

    #[tokio::test]
    async fn test_registry_type_overrides_simulator_type() {
        let mut sim = ScriptedSimulator::from_frames(vec![queue_frame(0)]);
        sim.advance_tick().await.unwrap();
        let layout = IntersectionLayout::gamma_cross();
        let mut registry = VehicleRegistry::new();
        registry.register(
            "aggr",
            VehicleTag {
                role: VehicleRole::Foe,
                vtype: VehicleType::Conservative,
                route: Route::new(Approach::Eb, Turn::Straight),
                slot: 2,
            },
        );
        let mut behavior = SideMoveBehavior::new(SideMoveConfig::default(), None);

        let started = behavior.on_tick(&mut sim, &layout, &registry).await.unwrap();
        assert!(started.is_empty());
        assert!(sim.relocations().is_empty());
    }

    #[tokio::test]
    async fn test_short_queue_is_ignored() {
        let mut frame = queue_frame(0);
        frame.lanes[0] = ScriptedLane::halting("1si_1", 1);
        let mut sim = ScriptedSimulator::from_frames(vec![frame]);
        sim.advance_tick().await.unwrap();
        let mut behavior = SideMoveBehavior::new(SideMoveConfig::default(), None);

        let started = behavior
            .on_tick(&mut sim, &IntersectionLayout::gamma_cross(), &VehicleRegistry::new())
            .await
            .unwrap();
        assert!(started.is_empty());
    }
}

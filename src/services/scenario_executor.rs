//! Scenario executor: one parameter vector in, one score vector out.
//!
//! A run walks `Init -> Warmup -> VehiclesPlaced -> Running -> Complete`.
//! Every run restores the simulator snapshot first, so runs never depend on
//! each other. Any simulator error aborts the run and is returned unchanged.

use async_trait::async_trait;
use std::fmt;
use tracing::{debug, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::config::ScenarioConfig;
use crate::domain::models::geometry::footprint_distance;
use crate::domain::models::intersection::{
    incoming_lane, Approach, LaneRole, Route, Turn, VehicleRegistry, VehicleRole, VehicleTag,
    VehicleType,
};
use crate::domain::models::parameter_space::ParameterVector;
use crate::domain::models::score::{keep_min, CollisionEvent, CollisionRole, ScoreVector};
use crate::domain::ports::{CollisionReport, ScenarioRunner, Simulator, SpawnRequest, VehicleState};

use super::scenario_metrics::{
    nearest_ahead, runs_red_light, BrakingTracker, LeadProximity, LeadVehicle, StopCounter,
};
use super::side_move::SideMoveBehavior;

/// Lane-change mode that disables every lane change.
const LANE_CHANGE_DISABLED: i32 = 0;

/// Lifecycle of one scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    /// Nothing placed yet; the snapshot is being restored
    Init,
    /// Advancing to the start time
    Warmup,
    /// DUT and traffic inserted and moved onto their lanes
    VehiclesPlaced,
    /// Ticking until the run ends
    Running,
    /// Score vector produced
    Complete,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Warmup => "warmup",
            Self::VehiclesPlaced => "vehicles_placed",
            Self::Running => "running",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// A background vehicle derived from the parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedVehicle {
    /// Vehicle id
    pub id: String,
    /// Role, type, route and queue slot
    pub tag: VehicleTag,
    /// Metres per second
    pub speed: f64,
}

/// Convert km/h to m/s.
pub fn kph_to_mps(kph: f64) -> f64 {
    kph / 3.6
}

/// Background traffic for a parameter vector.
///
/// For every queue slot, approach and lane, `vtype_<dir>_<lane><slot>`
/// selects no vehicle, a conservative or an aggressive one; its speed comes
/// from `<dir>_<lane>_s0` in km/h. A missing type feature means an empty
/// slot; a missing speed for an occupied slot is a configuration error.
pub fn plan_traffic(
    params: &ParameterVector,
    config: &ScenarioConfig,
) -> DomainResult<Vec<PlannedVehicle>> {
    let mut planned = Vec::new();
    for slot in 1..=config.traffic_slots {
        for approach in Approach::ALL {
            for turn in Turn::ALL {
                let route = Route::new(approach, turn);
                let type_feature = format!("vtype_{route}{slot}");
                let Some(code) = params.get(&type_feature) else {
                    continue;
                };
                if code.round() == 0.0 {
                    continue;
                }
                let vtype = VehicleType::from_parameter(code).ok_or_else(|| {
                    DomainError::config(format!(
                        "feature '{type_feature}' has invalid vehicle type {code}"
                    ))
                })?;
                let kph = params.require(&format!("{route}_s0"))?;

                planned.push(PlannedVehicle {
                    id: format!("{route}{slot}"),
                    tag: VehicleTag {
                        role: VehicleRole::Foe,
                        vtype,
                        route,
                        slot,
                    },
                    speed: kph_to_mps(kph),
                });
            }
        }
    }
    Ok(planned)
}

/// Drives scenario runs against one simulator connection.
pub struct ScenarioExecutor<S> {
    simulator: S,
    config: ScenarioConfig,
    state: ScenarioState,
}

impl<S: Simulator> ScenarioExecutor<S> {
    /// Create an executor for `simulator`.
    ///
    /// Fails when the braking thresholds cannot normalize a deceleration:
    /// the comfortable limit must be positive and strictly below the
    /// emergency limit.
    pub fn new(simulator: S, config: ScenarioConfig) -> DomainResult<Self> {
        let (comfortable, emergency) = (config.comfortable_decel, config.emergency_decel);
        if !(comfortable > 0.0 && emergency > comfortable) {
            return Err(DomainError::config(format!(
                "braking thresholds need 0 < comfortable ({comfortable}) < emergency ({emergency})"
            )));
        }
        Ok(Self {
            simulator,
            config,
            state: ScenarioState::Init,
        })
    }

    /// State reached by the last run.
    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Scenario settings used for every run.
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// The simulator connection.
    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    /// Consume the executor, returning the simulator connection.
    pub fn into_simulator(self) -> S {
        self.simulator
    }

    fn enter(&mut self, next: ScenarioState) {
        debug!(from = %self.state, to = %next, "Scenario state transition");
        self.state = next;
    }

    /// Run one complete scenario.
    #[instrument(skip(self, params), fields(dut = %self.config.dut_id, route = %self.config.route))]
    pub async fn execute(&mut self, params: &ParameterVector) -> DomainResult<ScoreVector> {
        let start_time = params.require(&self.config.start_time_feature)?;
        let dut_speed = kph_to_mps(params.require(&self.config.dut_speed_feature)?);
        let traffic = plan_traffic(params, &self.config)?;

        self.enter(ScenarioState::Init);
        self.simulator
            .reset_to_snapshot(&self.config.snapshot_path)
            .await?;

        self.enter(ScenarioState::Warmup);
        while self.simulator.time().await? < start_time {
            self.simulator.advance_tick().await?;
        }

        let registry =
            place_vehicles(&mut self.simulator, &self.config, dut_speed, &traffic).await?;
        self.enter(ScenarioState::VehiclesPlaced);

        self.enter(ScenarioState::Running);
        let score = run_to_completion(&mut self.simulator, &self.config, &registry).await?;

        self.enter(ScenarioState::Complete);
        debug!(
            time_at_end = score.time_at_end,
            collisions = score.n_collisions(),
            n_stops = score.n_stops,
            side_move = score.side_move,
            "Scenario complete"
        );
        Ok(score)
    }
}

#[async_trait]
impl<S: Simulator> ScenarioRunner for ScenarioExecutor<S> {
    async fn run(&mut self, params: &ParameterVector) -> DomainResult<ScoreVector> {
        self.execute(params).await
    }
}

/// Spawn the DUT and traffic on the staging route, insert them with one tick,
/// then move each onto its starting lane and route.
async fn place_vehicles<S: Simulator>(
    sim: &mut S,
    config: &ScenarioConfig,
    dut_speed: f64,
    traffic: &[PlannedVehicle],
) -> DomainResult<VehicleRegistry> {
    let mut registry = VehicleRegistry::new();
    let dut_id = config.dut_id.as_str();

    sim.spawn_vehicle(&SpawnRequest {
        id: dut_id.to_string(),
        type_id: config.dut_type.type_id().to_string(),
        route: config.warmup_route.clone(),
        depart_lane: config.dut_staging_lane,
        depart_speed: dut_speed,
    })
    .await?;
    sim.set_lane_change_mode(dut_id, LANE_CHANGE_DISABLED)
        .await?;
    registry.register(
        dut_id,
        VehicleTag {
            role: VehicleRole::Dut,
            vtype: config.dut_type,
            route: config.route,
            slot: 0,
        },
    );

    for (lane, vehicle) in traffic.iter().enumerate() {
        sim.spawn_vehicle(&SpawnRequest {
            id: vehicle.id.clone(),
            type_id: vehicle.tag.vtype.type_id().to_string(),
            route: config.warmup_route.clone(),
            depart_lane: lane,
            depart_speed: vehicle.speed,
        })
        .await?;
        sim.set_lane_change_mode(&vehicle.id, LANE_CHANGE_DISABLED)
            .await?;
        registry.register(vehicle.id.clone(), vehicle.tag);
    }

    sim.advance_tick().await?;

    for vehicle in traffic {
        let route = vehicle.tag.route;
        let position = config.turn_lane_length
            - config.queue_head_offset
            - f64::from(vehicle.tag.slot - 1) * config.vehicle_spacing;
        sim.relocate_vehicle(&vehicle.id, &route.start_lane(), position)
            .await?;
        sim.set_route(&vehicle.id, &route.to_string()).await?;
        sim.set_lane_change_mode(&vehicle.id, config.default_lane_change_mode)
            .await?;
    }

    let dut_lane = incoming_lane(config.route.approach, config.dut_lane_index);
    sim.relocate_vehicle(dut_id, &dut_lane, config.turn_lane_length - config.dut_setback)
        .await?;
    sim.set_route(dut_id, &config.route.to_string()).await?;
    sim.set_lane_change_mode(dut_id, config.default_lane_change_mode)
        .await?;

    debug!(traffic = traffic.len(), dut_lane = %dut_lane, "Vehicles placed");
    Ok(registry)
}

/// Trackers and partial score of a running scenario.
struct RunMetrics {
    score: ScoreVector,
    stops: StopCounter,
    braking: BrakingTracker,
    lead: LeadProximity,
    location: LaneRole,
}

impl RunMetrics {
    fn new(config: &ScenarioConfig) -> Self {
        Self {
            score: ScoreVector::default(),
            stops: StopCounter::new(),
            braking: BrakingTracker::new(config.comfortable_decel, config.emergency_decel),
            lead: LeadProximity::new(),
            location: LaneRole::Approach,
        }
    }

    fn finish(mut self) -> ScoreVector {
        self.score.n_stops = self.stops.stops();
        self.score.braking_force = self.braking.max_force();
        self.score.braking_force_norm = self.braking.normalized();
        self.score.dtc_front = self.lead.min_distance();
        self.score.ttc_front = self.lead.min_ttc();
        self.score
    }
}

fn collision_event(report: &CollisionReport, dut_id: &str, time: f64) -> Option<CollisionEvent> {
    let (dut_role, dut_speed, other_type, other_speed) = if report.collider == dut_id {
        (
            CollisionRole::Collider,
            report.collider_speed,
            &report.victim_type,
            report.victim_speed,
        )
    } else if report.victim == dut_id {
        (
            CollisionRole::Victim,
            report.victim_speed,
            &report.collider_type,
            report.collider_speed,
        )
    } else {
        return None;
    };

    Some(CollisionEvent {
        time,
        position: report.position,
        lane: report.lane.clone(),
        dut_role,
        dut_speed,
        other_type: other_type.clone(),
        other_speed,
    })
}

/// Vehicles on any of `lanes`, excluding `exclude`.
async fn vehicles_on<S: Simulator>(
    sim: &mut S,
    lanes: &[String],
    exclude: &str,
) -> DomainResult<Vec<String>> {
    let mut vehicles = Vec::new();
    for lane in lanes {
        vehicles.extend(
            sim.lane_vehicles(lane)
                .await?
                .into_iter()
                .filter(|id| id != exclude),
        );
    }
    Ok(vehicles)
}

/// Minimum footprint distance between the DUT and any of `others`.
async fn min_distance_to<S: Simulator>(
    sim: &mut S,
    dut: &VehicleState,
    others: &[String],
) -> DomainResult<Option<f64>> {
    let pose = dut.pose();
    let mut min = None;
    for other in others {
        let state = sim.vehicle_state(other).await?;
        keep_min(&mut min, footprint_distance(&pose, &state.pose()));
    }
    Ok(min)
}

async fn lead_vehicle<S: Simulator>(
    sim: &mut S,
    dut_id: &str,
    dut: &VehicleState,
) -> DomainResult<Option<LeadVehicle>> {
    let mut candidates = Vec::new();
    for other in sim.lane_vehicles(&dut.lane).await? {
        if other == dut_id {
            continue;
        }
        let state = sim.vehicle_state(&other).await?;
        candidates.push(LeadVehicle {
            offset: state.lane_position - dut.lane_position,
            length: state.length,
            speed: state.speed,
        });
    }
    Ok(nearest_ahead(candidates))
}

async fn run_to_completion<S: Simulator>(
    sim: &mut S,
    config: &ScenarioConfig,
    registry: &VehicleRegistry,
) -> DomainResult<ScoreVector> {
    let layout = &config.layout;
    let dut_id = config.dut_id.as_str();
    let movement = config.route.movement_index();

    let junction_lanes: Vec<String> = layout
        .lanes_with_role(LaneRole::Junction)
        .map(|lane| lane.id.clone())
        .collect();
    let approach_zone: Vec<String> = layout
        .lanes()
        .iter()
        .filter(|lane| matches!(lane.role, LaneRole::Approach | LaneRole::Junction))
        .map(|lane| lane.id.clone())
        .collect();

    let mut side_move = SideMoveBehavior::new(config.side_move.clone(), config.aggressive_speed_mode);
    let mut metrics = RunMetrics::new(config);
    let start = sim.time().await?;

    loop {
        if sim.min_expected_vehicles().await? == 0 {
            debug!("No vehicles left in the simulation");
            break;
        }
        sim.advance_tick().await?;
        let now = sim.time().await? - start;
        metrics.score.time_at_end = now;

        let started = side_move.on_tick(sim, layout, registry).await?;
        if !metrics.score.side_moved() && started.iter().any(|id| registry.is_dut(id)) {
            debug!(time = now, "DUT side move");
            metrics.score.side_move = now;
        }

        for report in sim.collisions().await? {
            if let Some(event) = collision_event(&report, dut_id, now) {
                debug!(time = now, role = %event.dut_role, lane = %event.lane, "DUT collision");
                metrics.score.collisions.push(event);
            }
        }

        if !sim.vehicle_exists(dut_id).await? {
            debug!(time = now, "DUT left the simulation");
            break;
        }
        let dut = sim.vehicle_state(dut_id).await?;

        let role = layout.role_of(&dut.lane);
        match (metrics.location, role) {
            (LaneRole::Approach, LaneRole::Junction) => {
                let phase = sim.traffic_light_state(&layout.traffic_light).await?;
                metrics.score.run_red_light = runs_red_light(&phase, movement)?;
                metrics.score.time_on_enter = Some(now);
                metrics.score.speed_on_enter = Some(dut.speed);
                metrics.score.foes_in_inter_on_enter =
                    vehicles_on(sim, &junction_lanes, dut_id).await?;
                debug!(
                    time = now,
                    phase = %phase,
                    run_red_light = metrics.score.run_red_light,
                    "DUT entered junction"
                );
                metrics.score.tl_state_on_enter = Some(phase);
            }
            (LaneRole::Junction, LaneRole::Egress) => {
                debug!(time = now, lane = %dut.lane, "DUT left junction");
            }
            _ => {}
        }
        if role != LaneRole::Other {
            metrics.location = role;
        }

        match metrics.location {
            LaneRole::Junction if dut.speed > 0.0 => {
                let others = vehicles_on(sim, &junction_lanes, dut_id).await?;
                if let Some(d) = min_distance_to(sim, &dut, &others).await? {
                    keep_min(&mut metrics.score.dtc_inter, d);
                }
            }
            LaneRole::Approach => {
                let others = vehicles_on(sim, &approach_zone, dut_id).await?;
                if let Some(d) = min_distance_to(sim, &dut, &others).await? {
                    keep_min(&mut metrics.score.dtc_approach, d);
                }
            }
            _ => {}
        }

        if let Some(lead) = lead_vehicle(sim, dut_id, &dut).await? {
            metrics.lead.observe(dut.speed, &lead);
        }
        metrics.braking.observe(dut.acceleration);
        metrics.stops.observe(dut.speed);

        if metrics.location == LaneRole::Egress && dut.lane_position > config.exit_offset {
            debug!(time = now, "DUT passed the exit marker");
            break;
        }
    }

    Ok(metrics.finish())
}

//! Intersection topology, routes and vehicle roles.
//!
//! Lane and vehicle roles are carried as explicit tagged data: lanes through an
//! [`IntersectionLayout`] lookup table, vehicles through a [`VehicleTag`]
//! recorded when they are spawned. Nothing downstream inspects id strings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;

/// Arm of the intersection a vehicle approaches from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    /// Eastbound
    Eb,
    /// Westbound
    Wb,
    /// Northbound
    Nb,
    /// Southbound
    Sb,
}

impl Approach {
    /// Every approach, in route-naming order.
    pub const ALL: [Self; 4] = [Self::Eb, Self::Wb, Self::Nb, Self::Sb];

    /// Prefix used in route and vehicle ids.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Eb => "eb",
            Self::Wb => "wb",
            Self::Nb => "nb",
            Self::Sb => "sb",
        }
    }

    /// Number used in the incoming edge id (`<n>si`).
    pub const fn edge_number(self) -> u8 {
        match self {
            Self::Eb => 1,
            Self::Wb => 2,
            Self::Nb => 3,
            Self::Sb => 4,
        }
    }

    /// Position of this arm's block of three links in the signal phase string.
    const fn signal_block(self) -> usize {
        match self {
            Self::Sb => 0,
            Self::Wb => 1,
            Self::Nb => 2,
            Self::Eb => 3,
        }
    }
}

/// Movement through the junction; also the incoming lane index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Turn {
    /// Rightmost lane, index 0
    Right,
    /// Middle lane, index 1
    Straight,
    /// Leftmost lane, index 2
    Left,
}

impl Turn {
    /// Every turn, rightmost first.
    pub const ALL: [Self; 3] = [Self::Right, Self::Straight, Self::Left];

    /// Suffix used in route ids.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Straight => "straight",
            Self::Left => "left",
        }
    }

    /// Incoming lane index serving this turn.
    pub const fn lane_index(self) -> u8 {
        match self {
            Self::Right => 0,
            Self::Straight => 1,
            Self::Left => 2,
        }
    }
}

/// A route through the intersection, e.g. `eb_left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Route {
    /// Arm the route enters from
    pub approach: Approach,
    /// Movement through the junction
    pub turn: Turn,
}

impl Route {
    /// Route for an approach and turn.
    pub const fn new(approach: Approach, turn: Turn) -> Self {
        Self { approach, turn }
    }

    /// Index of this movement's character in the traffic-light phase string.
    pub const fn movement_index(self) -> usize {
        self.approach.signal_block() * 3 + self.turn.lane_index() as usize
    }

    /// Incoming lane the route starts from.
    pub fn start_lane(self) -> String {
        incoming_lane(self.approach, self.turn.lane_index())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.approach.code(), self.turn.name())
    }
}

impl FromStr for Route {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (approach, turn) = s
            .split_once('_')
            .ok_or_else(|| DomainError::config(format!("invalid route '{s}'")))?;
        let approach = Approach::ALL
            .into_iter()
            .find(|a| a.code() == approach)
            .ok_or_else(|| DomainError::config(format!("invalid approach in route '{s}'")))?;
        let turn = Turn::ALL
            .into_iter()
            .find(|t| t.name() == turn)
            .ok_or_else(|| DomainError::config(format!("invalid turn in route '{s}'")))?;
        Ok(Self { approach, turn })
    }
}

impl TryFrom<String> for Route {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Route> for String {
    fn from(route: Route) -> Self {
        route.to_string()
    }
}

/// Incoming lane id for an approach and lane index.
pub fn incoming_lane(approach: Approach, index: u8) -> String {
    format!("{}si_{index}", approach.edge_number())
}

/// Driver model of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    /// Cautious driver model (`Car`)
    Conservative,
    /// Assertive driver model (`AggrCar`), eligible for side moves
    Aggressive,
}

impl VehicleType {
    /// Simulator vehicle-type id.
    pub const fn type_id(self) -> &'static str {
        match self {
            Self::Conservative => "Car",
            Self::Aggressive => "AggrCar",
        }
    }

    /// Driver model for a simulator vehicle-type id.
    pub fn from_type_id(type_id: &str) -> Option<Self> {
        match type_id {
            "Car" => Some(Self::Conservative),
            "AggrCar" => Some(Self::Aggressive),
            _ => None,
        }
    }

    /// Single-letter code used in output file names.
    pub const fn code(self) -> char {
        match self {
            Self::Conservative => 'c',
            Self::Aggressive => 'a',
        }
    }

    /// Decode the `vtype_*` parameter: 0 = no vehicle, 1 = conservative, 2 = aggressive.
    pub fn from_parameter(value: f64) -> Option<Self> {
        match value.round() as i64 {
            1 => Some(Self::Conservative),
            2 => Some(Self::Aggressive),
            _ => None,
        }
    }
}

/// Whether a spawned vehicle is the DUT or background traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleRole {
    /// Device under test
    Dut,
    /// Background traffic
    Foe,
}

/// Facts about a vehicle fixed at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleTag {
    /// DUT or background traffic
    pub role: VehicleRole,
    /// Driver model
    pub vtype: VehicleType,
    /// Route assigned after placement
    pub route: Route,
    /// Queue slot counted back from the stop line, starting at 1
    pub slot: u8,
}

/// Tags of every vehicle spawned for the current run, keyed by vehicle id.
#[derive(Debug, Clone, Default)]
pub struct VehicleRegistry {
    tags: HashMap<String, VehicleTag>,
}

impl VehicleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tag of a spawned vehicle, replacing any earlier one.
    pub fn register(&mut self, id: impl Into<String>, tag: VehicleTag) {
        self.tags.insert(id.into(), tag);
    }

    /// Tag of vehicle `id`, if it was registered.
    pub fn get(&self, id: &str) -> Option<&VehicleTag> {
        self.tags.get(id)
    }

    /// Whether `id` was registered as the DUT.
    pub fn is_dut(&self, id: &str) -> bool {
        self.get(id).is_some_and(|tag| tag.role == VehicleRole::Dut)
    }

    /// Number of registered vehicles.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether no vehicle was registered.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Forget every registered vehicle.
    pub fn clear(&mut self) {
        self.tags.clear();
    }
}

/// Where a lane sits relative to the junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneRole {
    /// Incoming lane before the stop line
    Approach,
    /// Internal lane inside the junction
    Junction,
    /// Outgoing lane after the junction
    Egress,
    /// Anything the layout does not know
    Other,
}

/// One lane of the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSpec {
    /// Lane id as reported by the simulator
    pub id: String,
    /// Position relative to the junction
    pub role: LaneRole,
    /// Edge the lane belongs to
    pub edge: String,
    /// Lane index within the edge, 0 = rightmost
    pub index: u8,
}

/// Lane lookup table for the intersection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LayoutDef", into = "LayoutDef")]
pub struct IntersectionLayout {
    /// Traffic-light id controlling the junction
    pub traffic_light: String,
    lanes: Vec<LaneSpec>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct LayoutDef {
    traffic_light: String,
    lanes: Vec<LaneSpec>,
}

impl From<LayoutDef> for IntersectionLayout {
    fn from(def: LayoutDef) -> Self {
        Self::new(def.traffic_light, def.lanes)
    }
}

impl From<IntersectionLayout> for LayoutDef {
    fn from(layout: IntersectionLayout) -> Self {
        Self {
            traffic_light: layout.traffic_light,
            lanes: layout.lanes,
        }
    }
}

impl IntersectionLayout {
    /// Layout from an explicit lane list.
    pub fn new(traffic_light: impl Into<String>, lanes: Vec<LaneSpec>) -> Self {
        let index = lanes
            .iter()
            .enumerate()
            .map(|(i, lane)| (lane.id.clone(), i))
            .collect();
        Self {
            traffic_light: traffic_light.into(),
            lanes,
            index,
        }
    }

    /// Four-arm, three-lane signalized cross.
    pub fn gamma_cross() -> Self {
        let mut lanes = Vec::new();
        for approach in Approach::ALL {
            let n = approach.edge_number();
            for turn in Turn::ALL {
                let index = turn.lane_index();
                lanes.push(LaneSpec {
                    id: incoming_lane(approach, index),
                    role: LaneRole::Approach,
                    edge: format!("{n}si"),
                    index,
                });
                lanes.push(LaneSpec {
                    id: format!("{n}o_{index}"),
                    role: LaneRole::Egress,
                    edge: format!("{n}o"),
                    index,
                });
            }
        }
        for link in 0..12u8 {
            lanes.push(LaneSpec {
                id: format!(":0_{link}_0"),
                role: LaneRole::Junction,
                edge: format!(":0_{link}"),
                index: 0,
            });
        }
        Self::new("0", lanes)
    }

    /// Every lane, in layout order.
    pub fn lanes(&self) -> &[LaneSpec] {
        &self.lanes
    }

    /// Lane with id `lane_id`.
    pub fn lane(&self, lane_id: &str) -> Option<&LaneSpec> {
        self.index.get(lane_id).map(|&i| &self.lanes[i])
    }

    /// Role of a lane; [`LaneRole::Other`] for lanes not in the layout.
    pub fn role_of(&self, lane_id: &str) -> LaneRole {
        self.lane(lane_id).map_or(LaneRole::Other, |lane| lane.role)
    }

    /// Lanes with the given role, in layout order.
    pub fn lanes_with_role(&self, role: LaneRole) -> impl Iterator<Item = &LaneSpec> {
        self.lanes.iter().filter(move |lane| lane.role == role)
    }

    /// Approach edges with their lanes sorted by index.
    pub fn approach_edges(&self) -> Vec<(String, Vec<&LaneSpec>)> {
        let mut edges: Vec<(String, Vec<&LaneSpec>)> = Vec::new();
        for lane in self.lanes_with_role(LaneRole::Approach) {
            match edges.iter_mut().find(|(edge, _)| *edge == lane.edge) {
                Some((_, lanes)) => lanes.push(lane),
                None => edges.push((lane.edge.clone(), vec![lane])),
            }
        }
        for (_, lanes) in &mut edges {
            lanes.sort_by_key(|lane| lane.index);
        }
        edges
    }
}

impl Default for IntersectionLayout {
    fn default() -> Self {
        Self::gamma_cross()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_index_matches_signal_order() {
        let cases = [
            ("sb_right", 0),
            ("sb_left", 2),
            ("wb_straight", 4),
            ("nb_right", 6),
            ("eb_right", 9),
            ("eb_straight", 10),
            ("eb_left", 11),
        ];
        for (route, expected) in cases {
            let route: Route = route.parse().unwrap();
            assert_eq!(route.movement_index(), expected, "{route}");
        }
    }

    #[test]
    fn test_route_round_trips_through_serde() {
        let route = Route::new(Approach::Eb, Turn::Left);
        let yaml = serde_yaml::to_string(&route).unwrap();
        assert_eq!(yaml.trim(), "eb_left");
        let parsed: Route = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, route);
        assert!("eb-left".parse::<Route>().is_err());
        assert!("xb_left".parse::<Route>().is_err());
    }

    #[test]
    fn test_start_lane() {
        assert_eq!(Route::new(Approach::Nb, Turn::Right).start_lane(), "3si_0");
    }

    #[test]
    fn test_vehicle_type_parameter_decoding() {
        assert_eq!(VehicleType::from_parameter(0.0), None);
        assert_eq!(
            VehicleType::from_parameter(1.0),
            Some(VehicleType::Conservative)
        );
        assert_eq!(
            VehicleType::from_parameter(2.0),
            Some(VehicleType::Aggressive)
        );
        assert_eq!(
            VehicleType::from_type_id("AggrCar"),
            Some(VehicleType::Aggressive)
        );
    }

    #[test]
    fn test_gamma_cross_roles() {
        let layout = IntersectionLayout::gamma_cross();
        assert_eq!(layout.role_of("1si_1"), LaneRole::Approach);
        assert_eq!(layout.role_of(":0_11_0"), LaneRole::Junction);
        assert_eq!(layout.role_of("2o_0"), LaneRole::Egress);
        assert_eq!(layout.role_of("warmup_0"), LaneRole::Other);

        let edges = layout.approach_edges();
        assert_eq!(edges.len(), 4);
        let indices: Vec<u8> = edges[0].1.iter().map(|lane| lane.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_deserialized_layout_is_indexed() {
        let yaml = r#"
traffic_light: "J1"
lanes:
  - { id: "a_0", role: approach, edge: "a", index: 0 }
  - { id: ":J1_0_0", role: junction, edge: ":J1_0", index: 0 }
"#;
        let layout: IntersectionLayout = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(layout.lanes().len(), 2);
        assert_eq!(layout.role_of(":J1_0_0"), LaneRole::Junction);
    }
}

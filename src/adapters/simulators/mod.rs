//! Simulator adapters.

pub mod scripted;

pub use scripted::{
    ScriptStart, ScriptedFrame, ScriptedLane, ScriptedScenario, ScriptedSimulator, ScriptedVehicle,
};

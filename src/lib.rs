pub mod adapter;
pub mod agent;
pub mod config;
pub mod conflicts;
pub mod debug;
pub mod error;
pub mod graph;
pub mod intervals;
pub mod propagation;
pub mod regulation;
pub mod report;
pub mod schedule;
pub mod simulator;
pub mod time;

#[cfg(test)]
mod cases;

pub use agent::{Agent, FnAgent, IdleAgent, Proposal, ScriptedAgent};
pub use config::Config;
pub use conflicts::Conflict;
pub use error::{Error, Result};
pub use intervals::TimeInterval;
pub use propagation::{propagate, Disturbance, DisturbanceKind, Propagator};
pub use regulation::{ArrivalDelta, RegulationOutcome, Regulator};
pub use schedule::{BlockId, Schedule, ScheduleBuilder, TrainId};
pub use time::Time;

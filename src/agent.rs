use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{schedule::Schedule, time::Time};

pub type DepartureShifts = BTreeMap<String, Time>;
pub type ExtraDwells = BTreeMap<String, BTreeMap<String, Time>>;

/// A regulation strategy. Both proposals are computed from the delayed
/// schedule alone and must not depend on anything else.
pub trait Agent {
    fn name(&self) -> &str;

    /// How long each train should wait before it departs.
    fn departures_to_shift(&self, schedule: &Schedule) -> DepartureShifts;

    /// Additional dwell per train and block.
    fn delays_to_add(&self, schedule: &Schedule) -> ExtraDwells;

    fn propose(&self, schedule: &Schedule) -> Proposal {
        Proposal {
            departure_shifts: self.departures_to_shift(schedule),
            extra_dwells: self.delays_to_add(schedule),
        }
    }
}

/// Output of an agent, times in seconds when serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Proposal {
    pub departure_shifts: DepartureShifts,
    pub extra_dwells: ExtraDwells,
}

impl Proposal {
    pub fn is_empty(&self) -> bool {
        self.departure_shifts.is_empty() && self.extra_dwells.values().all(|d| d.is_empty())
    }
}

/// Never proposes anything, so the regulated schedule is the delayed one.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdleAgent;

impl Agent for IdleAgent {
    fn name(&self) -> &str {
        "idle"
    }

    fn departures_to_shift(&self, _: &Schedule) -> DepartureShifts {
        DepartureShifts::new()
    }

    fn delays_to_add(&self, _: &Schedule) -> ExtraDwells {
        ExtraDwells::new()
    }
}

/// Agent made of two functions.
pub struct FnAgent<S, D> {
    name: String,
    shifts: S,
    dwells: D,
}

impl<S, D> FnAgent<S, D>
where
    S: Fn(&Schedule) -> DepartureShifts,
    D: Fn(&Schedule) -> ExtraDwells,
{
    pub fn new(name: &str, shifts: S, dwells: D) -> Self {
        FnAgent {
            name: name.to_string(),
            shifts,
            dwells,
        }
    }
}

impl<S, D> Agent for FnAgent<S, D>
where
    S: Fn(&Schedule) -> DepartureShifts,
    D: Fn(&Schedule) -> ExtraDwells,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn departures_to_shift(&self, schedule: &Schedule) -> DepartureShifts {
        (self.shifts)(schedule)
    }

    fn delays_to_add(&self, schedule: &Schedule) -> ExtraDwells {
        (self.dwells)(schedule)
    }
}

/// Replays a fixed proposal whatever the schedule looks like.
#[derive(Clone, Debug)]
pub struct ScriptedAgent {
    name: String,
    proposal: Proposal,
}

impl ScriptedAgent {
    pub fn new(name: &str, proposal: Proposal) -> Self {
        ScriptedAgent {
            name: name.to_string(),
            proposal,
        }
    }
}

impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn departures_to_shift(&self, _: &Schedule) -> DepartureShifts {
        self.proposal.departure_shifts.clone()
    }

    fn delays_to_add(&self, _: &Schedule) -> ExtraDwells {
        self.proposal.extra_dwells.clone()
    }
}

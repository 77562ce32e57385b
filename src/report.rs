use std::fmt::Write;

use serde::Serialize;

use crate::{
    agent::Proposal,
    regulation::{ArrivalDelta, RegulationOutcome},
    schedule::{Schedule, ScheduleTable},
    time::Time,
};

/// Outcome of a regulation run as written to the output file.
#[derive(Debug, Serialize)]
pub struct RegulationSummary {
    pub agent: String,
    pub proposal: Proposal,
    pub total_delay: Time,
    pub total_regulated_delay: Time,
    pub arrivals: Vec<ArrivalDelta>,
    pub delayed_conflicts: Vec<String>,
    pub regulated_conflicts: Vec<String>,
    pub nominal: ScheduleTable,
    pub delayed: ScheduleTable,
    pub regulated: ScheduleTable,
}

fn describe_conflicts(schedule: &Schedule) -> Vec<String> {
    schedule
        .conflicts()
        .iter()
        .map(|c| c.describe(schedule))
        .collect()
}

impl RegulationSummary {
    pub fn new(outcome: &RegulationOutcome) -> Self {
        RegulationSummary {
            agent: outcome.agent.clone(),
            proposal: outcome.proposal.clone(),
            total_delay: outcome.total_delay(),
            total_regulated_delay: outcome.total_regulated_delay(),
            arrivals: outcome.arrivals.clone(),
            delayed_conflicts: describe_conflicts(&outcome.delayed),
            regulated_conflicts: describe_conflicts(&outcome.regulated),
            nominal: outcome.nominal.to_table(),
            delayed: outcome.delayed.to_table(),
            regulated: outcome.regulated.to_table(),
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Arrival table, one line per train, followed by the totals.
pub fn arrival_table(outcome: &RegulationOutcome) -> String {
    let width = outcome
        .arrivals
        .iter()
        .map(|a| a.train.len())
        .max()
        .unwrap_or(0)
        .max("train".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:w$}  {:>8}  {:>8}  {:>9}  {:>8}  {:>9}",
        "train",
        "nominal",
        "delayed",
        "regulated",
        "delay",
        "reg.delay",
        w = width
    );
    for a in outcome.arrivals.iter() {
        let _ = writeln!(
            out,
            "{:w$}  {:>8}  {:>8}  {:>9}  {:>8}  {:>9}",
            a.train,
            a.nominal.clock(),
            a.delayed.clock(),
            a.regulated.clock(),
            a.delay().to_string(),
            a.regulated_delay().to_string(),
            w = width
        );
    }
    let _ = writeln!(
        out,
        "agent {}: total delay {} without regulation, {} with",
        outcome.agent,
        outcome.total_delay(),
        outcome.total_regulated_delay()
    );
    out
}

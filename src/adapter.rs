//! Reading simulator output and scenario files.
//!
//! The simulator reports, per train, the time the head of the train enters
//! each route and the time its tail clears it. Routes become blocks of the
//! schedule; a route that only sets one switch is named after that switch
//! so that trains passing the switch over different routes share a block.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    agent::Proposal,
    config::AdapterConfig,
    error::{Error, Result},
    propagation::Disturbance,
    schedule::{Schedule, ScheduleBuilder},
    time::Time,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteOccupancy {
    pub time_head_occupy: f64,
    pub time_tail_free: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub route_occupancies: IndexMap<String, RouteOccupancy>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainResult {
    #[serde(default)]
    pub eco_simulations: Option<Simulation>,
    #[serde(default)]
    pub base_simulations: Option<Simulation>,
}

/// Simulator output, trains in document order.
pub type SimulationOutput = IndexMap<String, TrainResult>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    #[serde(default)]
    pub switches_directions: IndexMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Infrastructure {
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl Infrastructure {
    /// Routes that set exactly one switch, mapped to that switch.
    pub fn single_switch_routes(&self) -> HashMap<&str, &str> {
        self.routes
            .iter()
            .filter(|r| r.switches_directions.len() == 1)
            .filter_map(|r| {
                r.switches_directions
                    .keys()
                    .next()
                    .map(|sw| (r.id.as_str(), sw.as_str()))
            })
            .collect()
    }
}

pub fn parse_simulation(json: &str) -> Result<SimulationOutput> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_infrastructure(json: &str) -> Result<Infrastructure> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_scenario(json: &str) -> Result<Scenario> {
    Ok(serde_json::from_str(json)?)
}

/// Shortens an identifier: every `-`-separated part loses the first matching
/// prefix, and the buffer stop marker is replaced by its label
/// (`rt.buffer_stop.0-sw.1` becomes `BS0-1`).
pub fn simplify_identifier(id: &str, config: &AdapterConfig) -> String {
    id.split('-')
        .map(|part| {
            let part = config
                .strip_prefixes
                .iter()
                .find_map(|p| part.strip_prefix(p.as_str()))
                .unwrap_or(part);
            if config.buffer_stop_marker.is_empty() {
                return part.to_string();
            }
            part.replace(
                &format!("{}.", config.buffer_stop_marker),
                &config.buffer_stop_label,
            )
            .replace(&config.buffer_stop_marker, &config.buffer_stop_label)
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn malformed(msg: String) -> Error {
    Error::AdapterMalformedInput(msg)
}

/// Builds the baseline schedule from simulator output.
pub fn schedule_from_simulation(
    output: &SimulationOutput,
    infrastructure: Option<&Infrastructure>,
    config: &AdapterConfig,
) -> Result<Schedule> {
    let _p = hprof::enter("read simulation");

    let switches = match infrastructure {
        Some(infra) if config.collapse_switches => infra.single_switch_routes(),
        _ => HashMap::new(),
    };

    let mut builder = ScheduleBuilder::new();
    for (train, result) in output.iter() {
        let (eco, base) = (result.eco_simulations.as_ref(), result.base_simulations.as_ref());
        let simulation = if config.prefer_eco {
            eco.or(base)
        } else {
            base.or(eco)
        }
        .ok_or_else(|| malformed(format!("train '{}' has no simulation", train)))?;

        builder.train(train);
        if simulation.route_occupancies.is_empty() {
            warn!("Train {} occupies no routes", train);
        }

        let mut seen = HashSet::new();
        let mut previous: Option<(&str, f64, f64)> = None;
        for (route, occ) in simulation.route_occupancies.iter() {
            let (head, tail) = (occ.time_head_occupy, occ.time_tail_free);
            for t in [head, tail] {
                if t < 0.0 || Time::try_from_secs_f64(t).is_none() {
                    return Err(malformed(format!(
                        "train '{}' on '{}': bad time {}",
                        train, route, t
                    )));
                }
            }
            if let Some((prev, prev_head, prev_tail)) = previous {
                if head < prev_head || tail < prev_tail {
                    return Err(malformed(format!(
                        "train '{}': times decrease from '{}' to '{}'",
                        train, prev, route
                    )));
                }
            }
            previous = Some((route.as_str(), head, tail));

            let mut block = switches
                .get(route.as_str())
                .map(|sw| sw.to_string())
                .unwrap_or_else(|| route.clone());
            if config.simplify_identifiers {
                block = simplify_identifier(&block, config);
            }
            if !seen.insert(block.clone()) {
                debug!("Train {} passes {} twice, keeping the first", train, block);
                continue;
            }
            builder.occupy(
                train,
                &block,
                Time::from_secs_f64(head),
                Time::from_secs_f64(tail),
            )?;
        }
    }

    let schedule = builder.build();
    info!(
        "Read {} trains over {} blocks",
        schedule.num_trains(),
        schedule.num_blocks()
    );
    Ok(schedule)
}

/// The block a train holds at time `threshold`, or the next one it enters.
pub fn block_at_time<'a>(schedule: &'a Schedule, train: &str, threshold: Time) -> Result<&'a str> {
    let t = schedule.train_id(train)?;
    let path = schedule.path_ids(t);
    let intervals = schedule.path_intervals(t).collect::<Vec<_>>();
    let idx = intervals
        .iter()
        .position(|i| i.contains(threshold))
        .or_else(|| intervals.iter().position(|i| i.time_start > threshold))
        .ok_or_else(|| Error::ThresholdBeyondPath {
            train: train.to_string(),
            threshold,
        })?;
    Ok(schedule.block_name(path[idx]))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DisturbanceSpec {
    pub train: String,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub time_threshold_s: Option<f64>,
    pub delay_s: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StopSpec {
    pub train: String,
    pub block: String,
    pub duration_s: f64,
}

/// What happens to the baseline, and optionally a fixed correction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub disturbances: Vec<DisturbanceSpec>,
    pub stops: Vec<StopSpec>,
    pub regulation: Proposal,
}

fn seconds(value: f64, what: &str, train: &str) -> Result<Time> {
    Time::try_from_secs_f64(value)
        .ok_or_else(|| malformed(format!("{} of train '{}' is out of range: {}", what, train, value)))
}

/// Turns the scenario's delays and stops into disturbances on the schedule,
/// delays first, each list in file order.
pub fn lower_disturbances(schedule: &Schedule, scenario: &Scenario) -> Result<Vec<Disturbance>> {
    let mut out = Vec::new();
    for spec in scenario.disturbances.iter() {
        let amount = seconds(spec.delay_s, "delay", &spec.train)?;
        let block = match (&spec.block, spec.time_threshold_s) {
            (Some(block), threshold) => {
                if threshold.is_some() {
                    warn!(
                        "Delay of {} names both a block and a threshold, using block {}",
                        spec.train, block
                    );
                }
                schedule.locate(&spec.train, block)?;
                block.as_str()
            }
            (None, Some(threshold)) => {
                let threshold = seconds(threshold, "threshold", &spec.train)?;
                let block = block_at_time(schedule, &spec.train, threshold)?;
                debug!("Delay of {} at {} lands on {}", spec.train, threshold, block);
                block
            }
            (None, None) => {
                return Err(malformed(format!(
                    "delay of train '{}' needs a block or a time threshold",
                    spec.train
                )))
            }
        };
        out.push(Disturbance::delay(&spec.train, block, amount));
    }
    for spec in scenario.stops.iter() {
        let amount = seconds(spec.duration_s, "stop", &spec.train)?;
        schedule.locate(&spec.train, &spec.block)?;
        out.push(Disturbance::stop(&spec.train, &spec.block, amount));
    }
    Ok(out)
}

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    config::PropagationConfig,
    debug::{Occupation, PropagationAction, PropagationStep, PropagationTrace},
    error::{Error, Result},
    schedule::{BlockId, Schedule, TrainId},
    time::Time,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisturbanceKind {
    /// The train enters the block late and everything after moves with it.
    Delay,
    /// The train stays longer on the block before moving on.
    Stop,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disturbance {
    pub train: String,
    pub block: String,
    pub kind: DisturbanceKind,
    pub amount: Time,
}

impl Disturbance {
    pub fn delay(train: &str, block: &str, amount: Time) -> Self {
        Disturbance {
            train: train.to_string(),
            block: block.to_string(),
            kind: DisturbanceKind::Delay,
            amount,
        }
    }

    pub fn stop(train: &str, block: &str, amount: Time) -> Self {
        Disturbance {
            train: train.to_string(),
            block: block.to_string(),
            kind: DisturbanceKind::Stop,
            amount,
        }
    }

    /// The rigid change of the disturbed train alone.
    pub fn apply(&self, schedule: &Schedule) -> Result<Schedule> {
        match self.kind {
            DisturbanceKind::Delay => schedule.add_delay(&self.train, &self.block, self.amount),
            DisturbanceKind::Stop => schedule.add_stop(&self.train, &self.block, self.amount),
        }
    }
}

/// Resolves conflicts by making later trains wait.
///
/// On every block, trains keep the order in which they entered it in the
/// reference schedule (equal entries: smaller train name first). Whenever a
/// train would enter a block before the train ahead of it in that order has
/// left, it is moved, together with the rest of its path, to enter when the
/// one ahead leaves. This is repeated until every block is entered in order
/// and no conflict is left.
#[derive(Clone, Debug, Default)]
pub struct Propagator {
    config: PropagationConfig,
}

impl Propagator {
    pub fn new(config: PropagationConfig) -> Self {
        Propagator { config }
    }

    pub fn step_budget(&self, schedule: &Schedule) -> usize {
        (self.config.step_budget_factor * schedule.num_trains() * schedule.num_blocks()).max(1)
    }

    pub fn propagate(&self, schedule: &Schedule, disturbance: &Disturbance) -> Result<Schedule> {
        self.propagate_traced(schedule, disturbance).map(|(s, _)| s)
    }

    pub fn propagate_traced(
        &self,
        schedule: &Schedule,
        disturbance: &Disturbance,
    ) -> Result<(Schedule, PropagationTrace)> {
        let _p = hprof::enter("propagate");
        let (train, block, _) = schedule.locate(&disturbance.train, &disturbance.block)?;
        let disturbed = disturbance.apply(schedule)?;

        let mut trace = PropagationTrace::default();
        if let Some(interval) = disturbed.interval(block, train) {
            trace.steps.push(PropagationStep {
                iteration: 0,
                actions: vec![PropagationAction::Disturbance(
                    Occupation {
                        train,
                        block,
                        interval,
                    },
                    disturbance.amount,
                )],
            });
        }

        let resolved = self.resolve(schedule, disturbed, &mut trace)?;
        info!(
            "{:?} of {} on {} by {}: {} trains pushed in {} passes",
            disturbance.kind,
            disturbance.train,
            disturbance.block,
            disturbance.amount,
            trace.pushed_trains().len(),
            trace.steps.len().saturating_sub(1)
        );
        Ok((resolved, trace))
    }

    /// Resolves the conflicts of a schedule using its own entry order.
    pub fn settle(&self, schedule: &Schedule) -> Result<Schedule> {
        let _p = hprof::enter("settle");
        let mut trace = PropagationTrace::default();
        self.resolve(schedule, schedule.clone(), &mut trace)
    }

    fn resolve(
        &self,
        reference: &Schedule,
        mut schedule: Schedule,
        trace: &mut PropagationTrace,
    ) -> Result<Schedule> {
        let budget = self.step_budget(&schedule);
        let rank = |block: BlockId, train: TrainId| {
            (
                reference
                    .interval(block, train)
                    .map(|i| i.time_start)
                    .unwrap_or(Time::MAX),
                reference.train_name(train),
            )
        };

        let mut iteration = 0;
        loop {
            // Consecutive trains in the reference order of a block where the
            // one behind enters before the one ahead has left.
            let mut waiting = Vec::new();
            for block in schedule.block_ids() {
                let mut order = schedule.occupants(block).collect::<Vec<_>>();
                order.sort_by(|(t1, _), (t2, _)| rank(block, *t1).cmp(&rank(block, *t2)));
                for pair in order.windows(2) {
                    let ((leader, lead), (follower, follow)) = (pair[0], pair[1]);
                    if follow.time_start < lead.time_end {
                        waiting.push((block, leader, follower));
                    }
                }
            }

            if waiting.is_empty() {
                debug!("Settled after {} passes", iteration);
                return Ok(schedule);
            }
            if iteration >= budget {
                return Err(Error::PropagationDiverged { steps: iteration });
            }
            iteration += 1;
            debug!("Pass {}: {} trains enter too early", iteration, waiting.len());

            // A push moves the rest of the follower's path too, so only its
            // earliest wait is resolved in this pass.
            let mut waits: BTreeMap<TrainId, (usize, Time, BlockId, TrainId)> = BTreeMap::new();
            for (block, leader, follower) in waiting {
                let (Some(lead), Some(follow), Some(idx)) = (
                    schedule.interval(block, leader),
                    schedule.interval(block, follower),
                    schedule.position(follower, block),
                ) else {
                    continue;
                };
                let delay = lead.time_end - follow.time_start;
                let replace = match waits.get(&follower) {
                    Some((other_idx, other_delay, _, _)) => {
                        idx < *other_idx || (idx == *other_idx && delay > *other_delay)
                    }
                    None => true,
                };
                if replace {
                    waits.insert(follower, (idx, delay, block, leader));
                }
            }

            let mut pushes = waits
                .into_iter()
                .map(|(follower, (idx, delay, block, leader))| (block, leader, follower, idx, delay))
                .collect::<Vec<_>>();
            pushes.sort_by(|a, b| {
                (
                    schedule.block_name(a.0),
                    schedule.train_name(a.1),
                    schedule.train_name(a.2),
                )
                    .cmp(&(
                        schedule.block_name(b.0),
                        schedule.train_name(b.1),
                        schedule.train_name(b.2),
                    ))
            });

            let mut actions = Vec::new();
            for (block, leader, follower, idx, delay) in pushes {
                let (Some(lead), Some(follow)) = (
                    schedule.interval(block, leader),
                    schedule.interval(block, follower),
                ) else {
                    continue;
                };
                debug!(
                    "  {} waits {} on {} for {}",
                    schedule.train_name(follower),
                    delay,
                    schedule.block_name(block),
                    schedule.train_name(leader)
                );
                schedule.shift_tail(follower, idx, delay)?;
                actions.push(PropagationAction::Push {
                    leader: Occupation {
                        train: leader,
                        block,
                        interval: lead,
                    },
                    follower: Occupation {
                        train: follower,
                        block,
                        interval: follow,
                    },
                    delay,
                });
            }
            trace.steps.push(PropagationStep {
                iteration,
                actions,
            });
        }
    }
}

/// Propagates a disturbance with the default step budget.
pub fn propagate(schedule: &Schedule, disturbance: &Disturbance) -> Result<Schedule> {
    Propagator::default().propagate(schedule, disturbance)
}

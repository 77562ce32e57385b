use std::fmt::Write;

use crate::{
    intervals::TimeInterval,
    schedule::{BlockId, Schedule, TrainId},
    time::Time,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PropagationTrace {
    pub steps: Vec<PropagationStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationStep {
    pub iteration: usize,
    pub actions: Vec<PropagationAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupation {
    pub train: TrainId,
    pub block: BlockId,
    pub interval: TimeInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationAction {
    /// The injected disturbance, before any conflict was looked at.
    Disturbance(Occupation, Time),
    /// `follower` (as it was before the push) waited for `leader` to clear
    /// the block.
    Push {
        leader: Occupation,
        follower: Occupation,
        delay: Time,
    },
}

impl PropagationTrace {
    pub fn num_pushes(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| s.actions.iter())
            .filter(|a| matches!(a, PropagationAction::Push { .. }))
            .count()
    }

    /// Trains pushed at least once, in order of their first push.
    pub fn pushed_trains(&self) -> Vec<TrainId> {
        let mut trains = Vec::new();
        for action in self.steps.iter().flat_map(|s| s.actions.iter()) {
            if let PropagationAction::Push { follower, .. } = action {
                if !trains.contains(&follower.train) {
                    trains.push(follower.train);
                }
            }
        }
        trains
    }

    pub fn summary(&self, schedule: &Schedule) -> String {
        let mut out = String::new();
        for step in self.steps.iter() {
            let _ = writeln!(out, "Step {}:", step.iteration);
            for action in step.actions.iter() {
                let _ = match action {
                    PropagationAction::Disturbance(occ, delay) => writeln!(
                        out,
                        "  disturb {} on {} {} by {}",
                        schedule.train_name(occ.train),
                        schedule.block_name(occ.block),
                        occ.interval,
                        delay
                    ),
                    PropagationAction::Push {
                        leader,
                        follower,
                        delay,
                    } => writeln!(
                        out,
                        "  {} waits {} on {} behind {} {}",
                        schedule.train_name(follower.train),
                        delay,
                        schedule.block_name(follower.block),
                        schedule.train_name(leader.train),
                        leader.interval
                    ),
                };
            }
        }
        out
    }
}

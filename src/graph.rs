use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::schedule::{BlockId, Schedule, TrainId};

/// Block graph derived from a schedule. It is a snapshot: rebuild it after
/// changing the schedule.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScheduleGraph {
    /// Edges `u -> v` with the trains that run from `u` directly to `v`.
    pub successions: BTreeMap<(BlockId, BlockId), BTreeSet<TrainId>>,
    /// Pairs of trains in conflict on a block, first entrant first.
    pub conflicts: BTreeMap<BlockId, BTreeSet<(TrainId, TrainId)>>,
}

impl ScheduleGraph {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        let mut graph = ScheduleGraph::default();
        for train in schedule.train_ids() {
            let path = schedule.path_ids(train);
            for (u, v) in path.iter().zip(path.iter().skip(1)) {
                graph
                    .successions
                    .entry((*u, *v))
                    .or_default()
                    .insert(train);
            }
        }
        for conflict in schedule.conflicts() {
            graph
                .conflicts
                .entry(conflict.block)
                .or_default()
                .insert((conflict.first, conflict.second));
        }
        graph
    }

    pub fn successors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.successions
            .keys()
            .filter(move |(u, _)| *u == block)
            .map(|(_, v)| *v)
    }

    pub fn predecessors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.successions
            .keys()
            .filter(move |(_, v)| *v == block)
            .map(|(u, _)| *u)
    }

    /// Mermaid flowchart of the block graph. Blocks with conflicts are
    /// highlighted and list the conflicting pairs.
    pub fn mermaid(&self, schedule: &Schedule) -> String {
        let mut out = String::from("graph LR\n");
        for block in schedule.block_ids() {
            let name = schedule.block_name(block);
            match self.conflicts.get(&block) {
                Some(pairs) => {
                    let pairs = pairs
                        .iter()
                        .map(|(a, b)| {
                            format!("{} x {}", schedule.train_name(*a), schedule.train_name(*b))
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    let _ = writeln!(out, "    {}[\"{}<br/>{}\"]", node(block), name, pairs);
                    let _ = writeln!(out, "    class {} conflict", node(block));
                }
                None => {
                    let _ = writeln!(out, "    {}[\"{}\"]", node(block), name);
                }
            }
        }
        for ((u, v), trains) in self.successions.iter() {
            let label = trains
                .iter()
                .map(|t| schedule.train_name(*t))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "    {} -->|{}| {}", node(*u), label, node(*v));
        }
        if !self.conflicts.is_empty() {
            out.push_str("    classDef conflict fill:#f96\n");
        }
        out
    }
}

fn node(block: BlockId) -> String {
    format!("b{}", usize::from(block))
}

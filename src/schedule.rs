use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::IndexMap;
use log::trace;
use typed_index_collections::TiVec;

use crate::{
    conflicts::{self, Conflict},
    error::{Error, Result},
    graph::ScheduleGraph,
    intervals::TimeInterval,
    time::Time,
};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TrainId(u32);

impl From<TrainId> for usize {
    fn from(v: TrainId) -> Self {
        v.0 as usize
    }
}

impl From<usize> for TrainId {
    fn from(x: usize) -> Self {
        TrainId(x as u32)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BlockId(u32);

impl From<BlockId> for usize {
    fn from(v: BlockId) -> Self {
        v.0 as usize
    }
}

impl From<usize> for BlockId {
    fn from(x: usize) -> Self {
        BlockId(x as u32)
    }
}

/// Block occupancies of a set of trains.
///
/// The table is sparse: a cell `(block, train)` exists only when the train
/// traverses the block. Each train's path is the sequence of its blocks
/// ordered by entry time. Paths are fixed when the schedule is built; every
/// mutator moves times but never adds, removes or reorders cells of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    train_names: TiVec<TrainId, String>,
    block_names: TiVec<BlockId, String>,
    train_lookup: HashMap<String, TrainId>,
    block_lookup: HashMap<String, BlockId>,
    occupancy: BTreeMap<(BlockId, TrainId), TimeInterval>,
    paths: TiVec<TrainId, Vec<BlockId>>,
}

/// Serializable view of a schedule: train → block → interval, in path order.
pub type ScheduleTable = IndexMap<String, IndexMap<String, TimeInterval>>;

#[derive(Default)]
pub struct ScheduleBuilder {
    train_names: TiVec<TrainId, String>,
    block_names: TiVec<BlockId, String>,
    train_lookup: HashMap<String, TrainId>,
    block_lookup: HashMap<String, BlockId>,
    cells: Vec<((BlockId, TrainId), TimeInterval)>,
    occupied: HashSet<(BlockId, TrainId)>,
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Declares a train. Trains are ordered by first declaration.
    pub fn train(&mut self, name: &str) -> TrainId {
        if let Some(id) = self.train_lookup.get(name) {
            return *id;
        }
        let id = self.train_names.push_and_get_key(name.to_string());
        self.train_lookup.insert(name.to_string(), id);
        id
    }

    /// Declares a block. Blocks are ordered by first declaration.
    pub fn block(&mut self, name: &str) -> BlockId {
        if let Some(id) = self.block_lookup.get(name) {
            return *id;
        }
        let id = self.block_names.push_and_get_key(name.to_string());
        self.block_lookup.insert(name.to_string(), id);
        id
    }

    pub fn occupy(&mut self, train: &str, block: &str, start: Time, end: Time) -> Result<&mut Self> {
        if end <= start {
            return Err(Error::InvalidInterval {
                train: train.to_string(),
                block: block.to_string(),
                start,
                end,
            });
        }
        let t = self.train(train);
        let b = self.block(block);
        if !self.occupied.insert((b, t)) {
            return Err(Error::DuplicateOccupancy {
                train: train.to_string(),
                block: block.to_string(),
            });
        }
        self.cells.push(((b, t), TimeInterval::new(start, end)));
        Ok(self)
    }

    /// Shorthand for `occupy` with times given in seconds.
    pub fn occupy_secs(&mut self, train: &str, block: &str, start: f64, end: f64) -> Result<&mut Self> {
        self.occupy(train, block, Time::from_secs_f64(start), Time::from_secs_f64(end))
    }

    pub fn build(self) -> Schedule {
        let mut paths: TiVec<TrainId, Vec<(Time, BlockId)>> =
            self.train_names.iter().map(|_| Vec::new()).collect();
        for ((b, t), interval) in self.cells.iter() {
            paths[*t].push((interval.time_start, *b));
        }
        // Stable, so equal entry times keep their insertion order.
        for path in paths.iter_mut() {
            path.sort_by_key(|(start, _)| *start);
        }

        Schedule {
            train_names: self.train_names,
            block_names: self.block_names,
            train_lookup: self.train_lookup,
            block_lookup: self.block_lookup,
            occupancy: self.cells.into_iter().collect(),
            paths: paths
                .into_iter()
                .map(|p| p.into_iter().map(|(_, b)| b).collect())
                .collect(),
        }
    }
}

impl Schedule {
    pub fn num_blocks(&self) -> usize {
        self.block_names.len()
    }

    pub fn num_trains(&self) -> usize {
        self.train_names.len()
    }

    pub fn trains(&self) -> impl Iterator<Item = &str> + '_ {
        self.train_names.iter().map(String::as_str)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &str> + '_ {
        self.block_names.iter().map(String::as_str)
    }

    pub fn train_ids(&self) -> impl Iterator<Item = TrainId> + '_ {
        self.train_names.keys()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.block_names.keys()
    }

    pub fn train_id(&self, train: &str) -> Result<TrainId> {
        self.train_lookup
            .get(train)
            .copied()
            .ok_or_else(|| Error::UnknownTrain(train.to_string()))
    }

    pub fn block_id(&self, block: &str) -> Result<BlockId> {
        self.block_lookup
            .get(block)
            .copied()
            .ok_or_else(|| Error::UnknownBlock(block.to_string()))
    }

    pub fn train_name(&self, train: TrainId) -> &str {
        &self.train_names[train]
    }

    pub fn block_name(&self, block: BlockId) -> &str {
        &self.block_names[block]
    }

    pub fn path(&self, train: &str) -> Result<Vec<&str>> {
        let t = self.train_id(train)?;
        Ok(self.paths[t].iter().map(|b| self.block_name(*b)).collect())
    }

    pub fn path_ids(&self, train: TrainId) -> &[BlockId] {
        &self.paths[train]
    }

    pub fn starts(&self, train: &str) -> Result<Vec<Time>> {
        let t = self.train_id(train)?;
        Ok(self.path_intervals(t).map(|i| i.time_start).collect())
    }

    pub fn ends(&self, train: &str) -> Result<Vec<Time>> {
        let t = self.train_id(train)?;
        Ok(self.path_intervals(t).map(|i| i.time_end).collect())
    }

    /// The train's occupancies in path order.
    pub fn path_intervals(&self, train: TrainId) -> impl Iterator<Item = TimeInterval> + '_ {
        self.paths[train]
            .iter()
            .map(move |b| self.occupancy[&(*b, train)])
    }

    pub fn interval(&self, block: BlockId, train: TrainId) -> Option<TimeInterval> {
        self.occupancy.get(&(block, train)).copied()
    }

    pub fn occupancy(&self, block: &str, train: &str) -> Option<TimeInterval> {
        let b = self.block_lookup.get(block)?;
        let t = self.train_lookup.get(train)?;
        self.interval(*b, *t)
    }

    /// Time the train spends on the block, zero when it does not pass there.
    pub fn duration_on(&self, block: &str, train: &str) -> Time {
        self.occupancy(block, train)
            .map(|i| i.length())
            .unwrap_or(Time::ZERO)
    }

    /// All trains on a block, ordered by train id.
    pub fn occupants(&self, block: BlockId) -> impl Iterator<Item = (TrainId, TimeInterval)> + '_ {
        self.occupancy
            .range((block, TrainId(0))..=(block, TrainId(u32::MAX)))
            .map(|((_, t), i)| (*t, *i))
    }

    /// All trains on a block in entry order. Equal entries are ordered by
    /// train name.
    pub fn entry_order(&self, block: BlockId) -> Vec<(TrainId, TimeInterval)> {
        let mut occupants = self.occupants(block).collect::<Vec<_>>();
        occupants.sort_by(|(t1, i1), (t2, i2)| {
            (i1.time_start, self.train_name(*t1)).cmp(&(i2.time_start, self.train_name(*t2)))
        });
        occupants
    }

    pub fn first_in(&self, block: &str) -> Result<Option<&str>> {
        let b = self.block_id(block)?;
        Ok(self
            .entry_order(b)
            .first()
            .map(|(t, _)| self.train_name(*t)))
    }

    /// Position of the block on the train's path.
    pub fn position(&self, train: TrainId, block: BlockId) -> Option<usize> {
        self.paths[train].iter().position(|b| *b == block)
    }

    pub fn locate(&self, train: &str, block: &str) -> Result<(TrainId, BlockId, usize)> {
        let t = self.train_id(train)?;
        let not_on_path = || Error::BlockNotOnPath {
            train: train.to_string(),
            block: block.to_string(),
        };
        let b = self.block_lookup.get(block).copied().ok_or_else(not_on_path)?;
        let idx = self.position(t, b).ok_or_else(not_on_path)?;
        Ok((t, b, idx))
    }

    pub fn previous_block(&self, train: &str, block: &str) -> Result<Option<&str>> {
        let (t, _, idx) = self.locate(train, block)?;
        Ok(idx
            .checked_sub(1)
            .map(|prev| self.block_name(self.paths[t][prev])))
    }

    pub fn next_block(&self, train: &str, block: &str) -> Result<Option<&str>> {
        let (t, _, idx) = self.locate(train, block)?;
        Ok(self.paths[t].get(idx + 1).map(|b| self.block_name(*b)))
    }

    /// Entry time into the last block of the train's path.
    pub fn arrival(&self, train: &str) -> Result<Option<Time>> {
        let t = self.train_id(train)?;
        Ok(self.path_intervals(t).last().map(|i| i.time_start))
    }

    /// True when the train enters the block while a train that entered
    /// before it still holds the block.
    pub fn is_action_needed(&self, block: &str, train: &str) -> Result<bool> {
        let (t, b, _) = self.locate(train, block)?;
        let mine = self.occupancy[&(b, t)];
        let my_key = (mine.time_start, self.train_name(t));
        Ok(self.occupants(b).any(|(other, interval)| {
            other != t
                && (interval.time_start, self.train_name(other)) < my_key
                && mine.time_start < interval.time_end
        }))
    }

    pub fn conflicts(&self) -> Vec<Conflict> {
        conflicts::detect(self)
    }

    pub fn is_conflict_free(&self) -> bool {
        conflicts::detect(self).is_empty()
    }

    pub fn add_delay(&self, train: &str, block: &str, delay: Time) -> Result<Schedule> {
        check_non_negative(train, delay)?;
        let (t, _, idx) = self.locate(train, block)?;
        let mut schedule = self.clone();
        schedule.shift_tail(t, idx, delay)?;
        Ok(schedule)
    }

    pub fn shift_departure(&self, train: &str, delta: Time) -> Result<Schedule> {
        let t = self.train_id(train)?;
        let mut schedule = self.clone();
        schedule.shift_tail(t, 0, delta)?;
        Ok(schedule)
    }

    pub fn add_stop(&self, train: &str, block: &str, duration: Time) -> Result<Schedule> {
        check_non_negative(train, duration)?;
        let (t, b, idx) = self.locate(train, block)?;
        let mut schedule = self.clone();
        if let Some(interval) = schedule.occupancy.get_mut(&(b, t)) {
            interval.time_end = interval
                .time_end
                .checked_add(duration)
                .ok_or_else(|| overflow(train))?;
        }
        schedule.shift_tail(t, idx + 1, duration)?;
        Ok(schedule)
    }

    /// Moves the occupancies of the train from path position `from_idx`
    /// onwards by `delta`.
    /// Nothing is moved when a shifted time would not fit in a `Time`.
    pub(crate) fn shift_tail(&mut self, train: TrainId, from_idx: usize, delta: Time) -> Result<()> {
        if delta == Time::ZERO {
            return Ok(());
        }
        trace!(
            "shift train {} from block #{} by {}",
            self.train_names[train],
            from_idx,
            delta
        );
        let mut shifted = Vec::new();
        for block in self.paths[train].iter().skip(from_idx) {
            if let Some(interval) = self.occupancy.get(&(*block, train)) {
                let moved = interval
                    .checked_shift(delta)
                    .ok_or_else(|| overflow(&self.train_names[train]))?;
                shifted.push((*block, moved));
            }
        }
        for (block, interval) in shifted {
            self.occupancy.insert((block, train), interval);
        }
        Ok(())
    }

    pub fn graph(&self) -> ScheduleGraph {
        ScheduleGraph::from_schedule(self)
    }

    pub fn mermaid(&self) -> String {
        self.graph().mermaid(self)
    }

    pub fn to_table(&self) -> ScheduleTable {
        self.train_names
            .iter_enumerated()
            .map(|(t, name)| {
                let blocks = self.paths[t]
                    .iter()
                    .map(|b| (self.block_names[*b].clone(), self.occupancy[&(*b, t)]))
                    .collect();
                (name.clone(), blocks)
            })
            .collect()
    }
}

fn overflow(train: &str) -> Error {
    Error::TimeOverflow {
        train: train.to_string(),
    }
}

fn check_non_negative(train: &str, amount: Time) -> Result<()> {
    if amount.is_negative() {
        return Err(Error::NegativeDuration {
            train: train.to_string(),
            amount,
        });
    }
    Ok(())
}

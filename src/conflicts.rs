use log::trace;

use crate::{
    intervals::{self, TimeInterval},
    schedule::{BlockId, Schedule, TrainId},
};

/// Two trains holding the same block at the same time. `first` is the train
/// that entered the block first (equal entries: smaller train name).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Conflict {
    pub block: BlockId,
    pub first: TrainId,
    pub second: TrainId,
    pub overlap: TimeInterval,
}

impl Conflict {
    pub fn describe(&self, schedule: &Schedule) -> String {
        format!(
            "{}: {} enters while {} holds it, overlap {}",
            schedule.block_name(self.block),
            schedule.train_name(self.second),
            schedule.train_name(self.first),
            self.overlap
        )
    }
}

/// All conflicts of the schedule, sorted by block name, then by the names of
/// the first and second train.
pub fn detect(schedule: &Schedule) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for block in schedule.block_ids() {
        let occupants = schedule.entry_order(block);
        if occupants.len() < 2 {
            continue;
        }
        let list = occupants.iter().map(|(_, i)| *i).collect::<Vec<_>>();
        for ((a, b), overlap) in intervals::overlapping(&list) {
            trace!(
                "conflict on {}: {} and {} share {}",
                schedule.block_name(block),
                schedule.train_name(occupants[a].0),
                schedule.train_name(occupants[b].0),
                overlap
            );
            conflicts.push(Conflict {
                block,
                first: occupants[a].0,
                second: occupants[b].0,
                overlap,
            });
        }
    }

    conflicts.sort_by(|c1, c2| {
        let key = |c: &Conflict| {
            (
                schedule.block_name(c.block),
                schedule.train_name(c.first),
                schedule.train_name(c.second),
            )
        };
        key(c1).cmp(&key(c2))
    });
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cases, schedule::ScheduleBuilder};

    #[test]
    pub fn overlapping_followers() {
        let s = cases::two_trains_same_path();
        let conflicts = detect(&s);
        assert_eq!(conflicts.len(), 3);
        let blocks = conflicts
            .iter()
            .map(|c| s.block_name(c.block))
            .collect::<Vec<_>>();
        assert_eq!(blocks, vec!["B0", "B1", "B2"]);
        for c in conflicts.iter() {
            assert_eq!(s.train_name(c.first), "t0");
            assert_eq!(s.train_name(c.second), "t1");
            assert_eq!(c.overlap.length(), crate::time::Time::from_millis(500));
        }
        assert_eq!(conflicts[0].overlap, TimeInterval::secs(0.5, 1.0));
        assert_eq!(
            conflicts[0].describe(&s),
            "B0: t1 enters while t0 holds it, overlap [0.500, 1.000)"
        );
    }

    #[test]
    pub fn headway_without_overlap_is_fine() {
        assert!(detect(&cases::two_trains_spaced()).is_empty());
        assert!(cases::three_train_line().is_conflict_free());
    }

    #[test]
    pub fn earlier_entrant_is_first_regardless_of_insertion() {
        let mut b = ScheduleBuilder::new();
        b.occupy_secs("late", "X", 3.0, 6.0).unwrap();
        b.occupy_secs("early", "X", 1.0, 4.0).unwrap();
        b.occupy_secs("third", "X", 5.0, 7.0).unwrap();
        let s = b.build();
        let pairs = detect(&s)
            .iter()
            .map(|c| (s.train_name(c.first), s.train_name(c.second)))
            .collect::<Vec<_>>();
        assert_eq!(pairs, vec![("early", "late"), ("late", "third")]);
    }

    #[test]
    pub fn conflicts_iff_not_disjoint() {
        for s in [
            cases::two_trains_same_path(),
            cases::two_trains_spaced(),
            cases::diverging_at_switch(),
            cases::two_separate_lines(),
        ] {
            let mut disjoint = true;
            for block in s.block_ids() {
                let occ = s.occupants(block).collect::<Vec<_>>();
                for (i, (_, a)) in occ.iter().enumerate() {
                    for (_, b) in occ.iter().skip(i + 1) {
                        disjoint &= !a.overlap(b);
                    }
                }
            }
            assert_eq!(detect(&s).is_empty(), disjoint);
        }
    }
}

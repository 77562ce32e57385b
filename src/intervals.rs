use std::collections::{BTreeMap, BTreeSet};

use crate::time::Time;

/// Half-open interval `[time_start, time_end)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize)]
pub struct TimeInterval {
    pub time_start: Time,
    pub time_end: Time,
}

impl TimeInterval {
    pub fn new(time_start: Time, time_end: Time) -> Self {
        TimeInterval {
            time_start,
            time_end,
        }
    }

    pub fn duration(start: Time, duration: Time) -> TimeInterval {
        TimeInterval {
            time_start: start,
            time_end: start + duration,
        }
    }

    pub fn secs(start: f64, end: f64) -> TimeInterval {
        TimeInterval::new(Time::from_secs_f64(start), Time::from_secs_f64(end))
    }

    pub fn is_empty(&self) -> bool {
        self.time_end <= self.time_start
    }

    pub fn contains(&self, t: Time) -> bool {
        self.time_start <= t && t < self.time_end
    }

    pub fn overlap(&self, other: &Self) -> bool {
        !(self.time_end <= other.time_start || other.time_end <= self.time_start)
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let time_start = self.time_start.max(other.time_start);
        let time_end = self.time_end.min(other.time_end);
        (time_start < time_end).then_some(Self {
            time_start,
            time_end,
        })
    }

    pub fn envelope(&self, other: &Self) -> Self {
        let time_start = self.time_start.min(other.time_start);
        let time_end = self.time_end.max(other.time_end);

        Self {
            time_start,
            time_end,
        }
    }

    pub fn length(&self) -> Time {
        self.time_end - self.time_start
    }

    pub fn checked_shift(&self, delta: Time) -> Option<Self> {
        Some(Self {
            time_start: self.time_start.checked_add(delta)?,
            time_end: self.time_end.checked_add(delta)?,
        })
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.time_start, self.time_end)
    }
}

// Ends sort before begins at the same instant, so touching intervals never
// share the sweep's active set.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum IntervalSide {
    End,
    Begin,
}

/// Every overlapping pair `(i, j)`, `i < j`, of the input intervals mapped to
/// the sub-interval they share.
pub fn overlapping(intervals: &[TimeInterval]) -> BTreeMap<(usize, usize), TimeInterval> {
    let mut events: Vec<((Time, IntervalSide), usize)> = intervals
        .iter()
        .enumerate()
        .filter(|(_, i)| !i.is_empty())
        .flat_map(|(idx, i)| {
            [
                ((i.time_start, IntervalSide::Begin), idx),
                ((i.time_end, IntervalSide::End), idx),
            ]
        })
        .collect();
    events.sort();

    let mut active: BTreeSet<usize> = BTreeSet::new();
    let mut pairs = BTreeMap::new();
    for ((_, side), idx) in events {
        match side {
            IntervalSide::Begin => {
                for other in active.iter().copied() {
                    let key = (other.min(idx), other.max(idx));
                    if let Some(shared) = intervals[other].intersect(&intervals[idx]) {
                        pairs.insert(key, shared);
                    }
                }
                active.insert(idx);
            }
            IntervalSide::End => {
                active.remove(&idx);
            }
        }
    }
    pairs
}

/// All pairwise intersections, one per overlapping pair, ordered by start.
pub fn intersections(intervals: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut shared = overlapping(intervals)
        .into_iter()
        .map(|(pair, i)| (i.time_start, pair, i))
        .collect::<Vec<_>>();
    shared.sort();
    shared.into_iter().map(|(_, _, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn iv(a: f64, b: f64) -> TimeInterval {
        TimeInterval::secs(a, b)
    }

    #[test]
    pub fn single_and_duplicate() {
        let a = iv(1.0, 2.0);
        assert!(intersections(&[a]).is_empty());
        assert_eq!(intersections(&[a, a]), vec![a]);
    }

    #[test]
    pub fn touching_do_not_intersect() {
        assert!(intersections(&[iv(0.0, 1.0), iv(1.0, 2.0)]).is_empty());
        assert!(overlapping(&[iv(1.0, 2.0), iv(0.0, 1.0)]).is_empty());
    }

    #[test]
    pub fn added_interval_against_fixed_ones() {
        let fixed = [iv(1.0, 2.0), iv(3.0, 4.0)];
        let table = [
            (iv(0.0, 1.5), vec![iv(1.0, 1.5)]),
            (iv(2.5, 3.5), vec![iv(3.0, 3.5)]),
            (iv(1.5, 3.5), vec![iv(1.5, 2.0), iv(3.0, 3.5)]),
            (iv(4.5, 5.0), vec![]),
        ];
        for (added, expected) in table {
            let mut list = fixed.to_vec();
            list.push(added);
            assert_eq!(intersections(&list), expected, "adding {}", added);
        }
    }

    #[test]
    pub fn envelope_covers_gap() {
        assert_eq!(iv(1.0, 2.0).envelope(&iv(3.0, 4.0)), iv(1.0, 4.0));
        assert_eq!(iv(3.0, 4.0).envelope(&iv(0.0, 3.5)), iv(0.0, 4.0));
        assert_eq!(iv(1.0, 2.0).envelope(&iv(3.0, 4.0)).length(), Time::from_secs(3));
    }

    #[test]
    pub fn labeled_pairs() {
        let list = [iv(0.0, 10.0), iv(2.0, 3.0), iv(2.5, 4.0), iv(20.0, 21.0)];
        let pairs = overlapping(&list);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[&(0, 1)], iv(2.0, 3.0));
        assert_eq!(pairs[&(0, 2)], iv(2.5, 4.0));
        assert_eq!(pairs[&(1, 2)], iv(2.5, 3.0));
    }

    #[test]
    pub fn later_index_starting_first() {
        let pairs = overlapping(&[iv(5.0, 7.0), iv(4.0, 6.0)]);
        assert_eq!(pairs.into_iter().collect::<Vec<_>>(), vec![((0, 1), iv(5.0, 6.0))]);
    }

    proptest! {
        #[test]
        fn sweep_agrees_with_pairwise_check(
            raw in prop::collection::vec((0i64..50, 1i64..20), 0..12)
        ) {
            let list = raw
                .iter()
                .map(|(s, d)| TimeInterval::duration(Time::from_millis(*s), Time::from_millis(*d)))
                .collect::<Vec<_>>();
            let pairs = overlapping(&list);
            for i in 0..list.len() {
                for j in (i + 1)..list.len() {
                    prop_assert_eq!(pairs.get(&(i, j)).copied(), list[i].intersect(&list[j]));
                }
            }
            let starts = intersections(&list).iter().map(|i| i.time_start).collect::<Vec<_>>();
            prop_assert!(starts.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}

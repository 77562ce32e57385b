//! Small hand-written schedules used by the unit tests.

use crate::schedule::{Schedule, ScheduleBuilder};

fn build(trains: &[(&str, &[(&str, f64, f64)])]) -> Schedule {
    let mut b = ScheduleBuilder::new();
    for (train, visits) in trains {
        for (block, start, end) in visits.iter() {
            b.occupy_secs(train, block, *start, *end).unwrap();
        }
    }
    b.build()
}

/// Two trains on the same three blocks, the second half a block behind.
pub fn two_trains_same_path() -> Schedule {
    build(&[
        ("t0", &[("B0", 0.0, 1.0), ("B1", 1.0, 2.0), ("B2", 2.0, 3.0)]),
        ("t1", &[("B0", 0.5, 1.5), ("B1", 1.5, 2.5), ("B2", 2.5, 3.5)]),
    ])
}

/// Two trains on the same three blocks with a full block of headway.
pub fn two_trains_spaced() -> Schedule {
    build(&[
        ("t0", &[("B0", 0.0, 1.0), ("B1", 1.0, 2.0), ("B2", 2.0, 3.0)]),
        ("t1", &[("B0", 1.0, 2.0), ("B1", 2.0, 3.0), ("B2", 3.0, 4.0)]),
    ])
}

/// Two trains sharing the approach to a switch, then taking different legs.
pub fn diverging_at_switch() -> Schedule {
    build(&[
        ("t0", &[("B_pre", 0.0, 1.0), ("B_a", 1.0, 2.0)]),
        ("t1", &[("B_pre", 0.5, 1.5), ("B_b", 1.5, 2.5)]),
    ])
}

/// Three trains in a row on a line whose middle block is a station with a
/// long dwell. Station occupancies follow each other without slack.
pub fn three_train_line() -> Schedule {
    build(&[
        ("ic1", &[("A", 0.0, 10.0), ("S", 10.0, 40.0), ("B", 40.0, 50.0)]),
        ("re2", &[("A", 30.0, 40.0), ("S", 40.0, 70.0), ("B", 70.0, 80.0)]),
        ("ic3", &[("A", 60.0, 70.0), ("S", 70.0, 80.0), ("B", 80.0, 90.0)]),
    ])
}

/// Two independent pairs of trains on two separate lines.
pub fn two_separate_lines() -> Schedule {
    build(&[
        ("n0", &[("N0", 0.0, 2.0), ("N1", 2.0, 4.0)]),
        ("n1", &[("N0", 2.0, 4.0), ("N1", 4.0, 6.0)]),
        ("s0", &[("S0", 0.0, 3.0), ("S1", 3.0, 6.0)]),
        ("s1", &[("S0", 3.0, 5.0), ("S1", 6.0, 8.0)]),
    ])
}

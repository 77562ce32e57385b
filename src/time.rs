use derive_more::{Add, AddAssign, Neg, Sub, SubAssign};

/// A point in time or a duration, counted in milliseconds from the start of
/// the simulation.
///
/// Simulator output is given in floating seconds; it is rounded to the
/// nearest millisecond when it enters the model so that shifting a train
/// back and forth reproduces the exact same schedule.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Debug,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Neg,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(from = "f64", into = "f64")]
pub struct Time(i64);

pub type TimeValue = i64;

impl Time {
    pub const ZERO: Time = Time(0);
    pub const MAX: Time = Time(TimeValue::MAX);

    pub const fn from_millis(ms: TimeValue) -> Self {
        Time(ms)
    }

    pub fn from_secs(s: TimeValue) -> Self {
        Time(s * 1000)
    }

    /// Largest magnitude, in seconds, accepted from input files. Sums of a
    /// few such times stay far from the `i64` range.
    pub const MAX_INPUT_SECS: f64 = 1.0e12;

    pub fn from_secs_f64(s: f64) -> Self {
        Time((s * 1000.0).round() as TimeValue)
    }

    /// Like `from_secs_f64`, but `None` for values that are not finite or
    /// exceed `MAX_INPUT_SECS`.
    pub fn try_from_secs_f64(s: f64) -> Option<Self> {
        if s.is_finite() && s.abs() <= Self::MAX_INPUT_SECS {
            Some(Time::from_secs_f64(s))
        } else {
            None
        }
    }

    pub fn checked_add(self, other: Time) -> Option<Time> {
        self.0.checked_add(other.0).map(Time)
    }

    pub fn as_millis(self) -> TimeValue {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Formats the time as a wall clock `HH:MM:SS` counted from midnight of
    /// the simulation day. Times outside of one day are printed as seconds.
    pub fn clock(self) -> String {
        let secs = self.0.div_euclid(1000);
        match u32::try_from(secs)
            .ok()
            .and_then(|s| chrono::NaiveTime::from_num_seconds_from_midnight_opt(s, 0))
        {
            Some(t) => t.format("%H:%M:%S").to_string(),
            None => format!("{}s", self),
        }
    }
}

impl From<f64> for Time {
    fn from(s: f64) -> Self {
        Time::from_secs_f64(s)
    }
}

impl From<Time> for f64 {
    fn from(t: Time) -> Self {
        t.as_secs_f64()
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:03}", sign, abs / 1000, abs % 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn seconds_round_to_millis() {
        assert_eq!(Time::from_secs_f64(1.5), Time::from_millis(1500));
        assert_eq!(Time::from_secs_f64(0.0004), Time::ZERO);
        assert_eq!(Time::from_secs_f64(2.0006), Time::from_millis(2001));
        assert_eq!(Time::from_secs(3).as_secs_f64(), 3.0);
    }

    #[test]
    pub fn out_of_range_seconds() {
        assert_eq!(Time::try_from_secs_f64(1.5), Some(Time::from_millis(1500)));
        assert_eq!(Time::try_from_secs_f64(1e17), None);
        assert_eq!(Time::try_from_secs_f64(f64::NAN), None);
        assert_eq!(Time::try_from_secs_f64(f64::NEG_INFINITY), None);
        assert_eq!(Time::MAX.checked_add(Time::from_millis(1)), None);
        assert_eq!(
            Time::from_secs(1).checked_add(Time::from_millis(-250)),
            Some(Time::from_millis(750))
        );
    }

    #[test]
    pub fn display() {
        assert_eq!(Time::from_millis(1500).to_string(), "1.500");
        assert_eq!(Time::from_millis(-250).to_string(), "-0.250");
        assert_eq!(Time::from_secs(3725).clock(), "01:02:05");
    }

    #[test]
    pub fn serde_as_seconds() {
        let t: Time = serde_json::from_str("12.25").unwrap();
        assert_eq!(t, Time::from_millis(12250));
        assert_eq!(serde_json::to_string(&t).unwrap(), "12.25");
    }
}

use log::{debug, info};
use serde::Serialize;

use crate::{
    agent::{Agent, Proposal},
    error::{Error, Result},
    propagation::{Disturbance, Propagator},
    schedule::Schedule,
    time::Time,
};

/// Arrival of one train at the last block of its path in the three schedules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArrivalDelta {
    pub train: String,
    pub nominal: Time,
    pub delayed: Time,
    pub regulated: Time,
}

impl ArrivalDelta {
    pub fn delay(&self) -> Time {
        self.delayed - self.nominal
    }

    pub fn regulated_delay(&self) -> Time {
        self.regulated - self.nominal
    }

    /// Positive when the agent made the train arrive earlier than doing nothing.
    pub fn gain(&self) -> Time {
        self.delayed - self.regulated
    }
}

#[derive(Clone, Debug)]
pub struct RegulationOutcome {
    pub agent: String,
    pub proposal: Proposal,
    pub nominal: Schedule,
    pub delayed: Schedule,
    pub regulated: Schedule,
    pub arrivals: Vec<ArrivalDelta>,
}

impl RegulationOutcome {
    pub fn total_delay(&self) -> Time {
        self.arrivals.iter().map(|a| a.delay()).fold(Time::ZERO, |a, b| a + b)
    }

    pub fn total_regulated_delay(&self) -> Time {
        self.arrivals
            .iter()
            .map(|a| a.regulated_delay())
            .fold(Time::ZERO, |a, b| a + b)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Regulator {
    propagator: Propagator,
}

impl Regulator {
    pub fn new(propagator: Propagator) -> Self {
        Regulator { propagator }
    }

    /// Disturbs the baseline, asks the agent for a correction, applies it
    /// and resolves what is left.
    pub fn regulate(
        &self,
        baseline: &Schedule,
        disturbances: &[Disturbance],
        agent: &dyn Agent,
    ) -> Result<RegulationOutcome> {
        let _p = hprof::enter("regulate");

        let mut delayed = baseline.clone();
        for disturbance in disturbances.iter() {
            delayed = self.propagator.propagate(&delayed, disturbance)?;
        }
        info!(
            "{} disturbances applied, {} conflicts left",
            disturbances.len(),
            delayed.conflicts().len()
        );

        let proposal = {
            let _p = hprof::enter("agent");
            agent.propose(&delayed)
        };
        validate(agent.name(), &delayed, &proposal)?;

        let mut corrected = delayed.clone();
        for (train, shift) in proposal.departure_shifts.iter() {
            debug!("{} holds {} by {}", agent.name(), train, shift);
            corrected = corrected.shift_departure(train, *shift)?;
        }
        for (train, dwells) in proposal.extra_dwells.iter() {
            for (block, dwell) in dwells.iter() {
                debug!("{} adds {} on {} to {}", agent.name(), dwell, block, train);
                corrected = corrected.add_stop(train, block, *dwell)?;
            }
        }
        let regulated = self.propagator.settle(&corrected)?;

        let arrivals = arrivals(baseline, &delayed, &regulated)?;
        let outcome = RegulationOutcome {
            agent: agent.name().to_string(),
            proposal,
            nominal: baseline.clone(),
            delayed,
            regulated,
            arrivals,
        };
        info!(
            "Agent {}: total arrival delay {} without regulation, {} with",
            outcome.agent,
            outcome.total_delay(),
            outcome.total_regulated_delay()
        );
        Ok(outcome)
    }
}

fn validate(agent: &str, schedule: &Schedule, proposal: &Proposal) -> Result<()> {
    let invalid = |reason: String| Error::InvalidAgentProposal {
        agent: agent.to_string(),
        reason,
    };

    for (train, shift) in proposal.departure_shifts.iter() {
        schedule
            .train_id(train)
            .map_err(|_| invalid(format!("unknown train '{}'", train)))?;
        if shift.is_negative() {
            return Err(invalid(format!("negative shift {} for '{}'", shift, train)));
        }
        if shift.as_secs_f64() > Time::MAX_INPUT_SECS {
            return Err(invalid(format!("shift {} for '{}' is too large", shift, train)));
        }
    }
    for (train, dwells) in proposal.extra_dwells.iter() {
        schedule
            .train_id(train)
            .map_err(|_| invalid(format!("unknown train '{}'", train)))?;
        for (block, dwell) in dwells.iter() {
            schedule
                .locate(train, block)
                .map_err(|_| invalid(format!("block '{}' is not on the path of '{}'", block, train)))?;
            if dwell.is_negative() || dwell.as_secs_f64() > Time::MAX_INPUT_SECS {
                return Err(invalid(format!(
                    "dwell {} for '{}' on '{}' is out of range",
                    dwell, train, block
                )));
            }
        }
    }
    Ok(())
}

fn arrivals(nominal: &Schedule, delayed: &Schedule, regulated: &Schedule) -> Result<Vec<ArrivalDelta>> {
    let mut arrivals = Vec::new();
    for train in nominal.trains() {
        if let (Some(n), Some(d), Some(r)) = (
            nominal.arrival(train)?,
            delayed.arrival(train)?,
            regulated.arrival(train)?,
        ) {
            arrivals.push(ArrivalDelta {
                train: train.to_string(),
                nominal: n,
                delayed: d,
                regulated: r,
            });
        }
    }
    Ok(arrivals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{DepartureShifts, ExtraDwells, FnAgent, IdleAgent, ScriptedAgent},
        cases,
        config::PropagationConfig,
    };

    fn secs(s: f64) -> Time {
        Time::from_secs_f64(s)
    }

    fn shift(train: &str, s: f64) -> Proposal {
        let mut p = Proposal::default();
        p.departure_shifts.insert(train.to_string(), secs(s));
        p
    }

    #[test]
    pub fn agent_lets_follower_overtake() {
        let s = cases::two_trains_same_path();
        let agent = FnAgent::new(
            "hold-t0",
            |_: &Schedule| -> DepartureShifts { [("t0".to_string(), secs(5.0))].into_iter().collect() },
            |_: &Schedule| -> ExtraDwells { ExtraDwells::new() },
        );
        let out = Regulator::default().regulate(&s, &[], &agent).unwrap();
        assert_eq!(out.delayed, s);
        assert_eq!(out.regulated.occupancy("B0", "t0").unwrap().time_start, secs(5.0));
        assert_eq!(out.regulated.starts("t1").unwrap(), s.starts("t1").unwrap());
        assert_eq!(out.regulated.ends("t1").unwrap(), s.ends("t1").unwrap());
        assert!(out.regulated.conflicts().is_empty());
        assert_eq!(out.agent, "hold-t0");
    }

    #[test]
    pub fn idle_agent_keeps_delayed_schedule() {
        let s = cases::two_trains_spaced();
        let d = Disturbance::delay("t0", "B0", secs(1.0));
        let out = Regulator::default().regulate(&s, &[d], &IdleAgent).unwrap();
        assert_eq!(out.regulated, out.delayed);
        assert_eq!(out.nominal, s);

        let t0 = &out.arrivals[0];
        assert_eq!(t0.train, "t0");
        assert_eq!((t0.nominal, t0.delayed, t0.regulated), (secs(2.0), secs(3.0), secs(3.0)));
        assert_eq!(t0.delay(), secs(1.0));
        assert_eq!(t0.gain(), Time::ZERO);
        let t1 = &out.arrivals[1];
        assert_eq!((t1.nominal, t1.delayed), (secs(3.0), secs(4.0)));
        assert_eq!(out.total_delay(), secs(2.0));
    }

    #[test]
    pub fn disturbances_apply_in_order() {
        let s = cases::three_train_line();
        let ds = [
            Disturbance::stop("ic1", "S", secs(15.0)),
            Disturbance::delay("ic3", "B", secs(5.0)),
        ];
        let out = Regulator::default().regulate(&s, &ds, &IdleAgent).unwrap();
        assert_eq!(out.delayed.starts("re2").unwrap(), vec![secs(30.0), secs(55.0), secs(85.0)]);
        assert_eq!(out.delayed.starts("ic3").unwrap(), vec![secs(60.0), secs(85.0), secs(100.0)]);
        assert!(out.delayed.is_conflict_free());
    }

    #[test]
    pub fn extra_dwell_is_resolved() {
        // Holding t0 at B1 makes t1 wait behind it.
        let s = cases::two_trains_spaced();
        let mut p = Proposal::default();
        p.extra_dwells
            .entry("t0".to_string())
            .or_default()
            .insert("B1".to_string(), secs(2.0));
        let out = Regulator::default()
            .regulate(&s, &[], &ScriptedAgent::new("dwell", p))
            .unwrap();
        assert_eq!(out.regulated.starts("t0").unwrap(), vec![secs(0.0), secs(1.0), secs(4.0)]);
        assert_eq!(out.regulated.starts("t1").unwrap(), vec![secs(1.0), secs(4.0), secs(5.0)]);
        assert!(out.regulated.is_conflict_free());
        assert_eq!(out.arrivals[1].regulated_delay(), secs(2.0));
    }

    #[test]
    pub fn bad_proposals_are_rejected() {
        let s = cases::diverging_at_switch();
        let r = Regulator::default();
        let mut off_path = Proposal::default();
        off_path
            .extra_dwells
            .entry("t0".to_string())
            .or_default()
            .insert("B_b".to_string(), secs(1.0));
        for p in [shift("t9", 1.0), shift("t0", -1.0), shift("t1", 1e17), off_path] {
            assert!(matches!(
                r.regulate(&s, &[], &ScriptedAgent::new("bad", p)),
                Err(Error::InvalidAgentProposal { .. })
            ));
        }
    }

    #[test]
    pub fn divergence_surfaces_unchanged() {
        let s = cases::three_train_line();
        let r = Regulator::new(Propagator::new(PropagationConfig {
            step_budget_factor: 0,
        }));
        let d = Disturbance::stop("ic1", "S", secs(15.0));
        assert!(matches!(
            r.regulate(&s, &[d], &IdleAgent),
            Err(Error::PropagationDiverged { .. })
        ));
    }
}

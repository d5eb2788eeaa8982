//! The five scheduling disciplines.
//!
//! Policies are pure: `schedule` reads an immutable [`Batch`] and produces an
//! [`ExecutionPlan`] with virtual-clock timestamps. All side effects against
//! real execution units happen later, when the binding replays the plan.

use std::str::FromStr;

use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::types::{Batch, Duration, ExecutionPlan, JobId, JobSpec, ScheduledJob, Slice, Time};
use crate::utils::prelude::*;

mod fcfs;
mod hrrn;
mod round_robin;
mod spn;
mod srt;

pub use fcfs::Fcfs;
pub use hrrn::Hrrn;
pub use round_robin::RoundRobin;
pub use spn::Spn;
pub use srt::Srt;

/// Round Robin quantum used when the config does not say otherwise
pub const DEFAULT_QUANTUM: Duration = Duration(2);

/// A scheduling discipline, polymorphic over a single capability
pub trait Policy: std::fmt::Debug {
    fn kind(&self) -> PolicyKind;

    /// Order the batch on the virtual clock. An empty batch yields an
    /// empty plan.
    fn schedule(&self, batch: &Batch) -> ExecutionPlan;
}

impl Policy for Box<dyn Policy> {
    #[inline]
    fn kind(&self) -> PolicyKind {
        (**self).kind()
    }

    #[inline]
    fn schedule(&self, batch: &Batch) -> ExecutionPlan {
        (**self).schedule(batch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum PolicyKind {
    #[display("FCFS")]
    Fcfs,
    #[display("RR")]
    RoundRobin,
    #[display("SPN")]
    Spn,
    #[display("SRT")]
    Srt,
    #[display("HRRN")]
    Hrrn,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::Fcfs,
        PolicyKind::RoundRobin,
        PolicyKind::Spn,
        PolicyKind::Srt,
        PolicyKind::Hrrn,
    ];

    pub fn build(self, quantum: Duration) -> Box<dyn Policy> {
        match self {
            PolicyKind::Fcfs => Box::new(Fcfs),
            PolicyKind::RoundRobin => Box::new(RoundRobin::new(quantum)),
            PolicyKind::Spn => Box::new(Spn),
            PolicyKind::Srt => Box::new(Srt),
            PolicyKind::Hrrn => Box::new(Hrrn),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PolicyKind::Fcfs => "first-come-first-served, non-preemptive",
            PolicyKind::RoundRobin => "round robin, preemptive with fixed quantum",
            PolicyKind::Spn => "shortest process next, non-preemptive",
            PolicyKind::Srt => "shortest remaining time, preemptive per time unit",
            PolicyKind::Hrrn => "highest response ratio next, non-preemptive",
        }
    }
}

impl FromStr for PolicyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fcfs" => Ok(PolicyKind::Fcfs),
            "rr" | "round-robin" | "round_robin" => Ok(PolicyKind::RoundRobin),
            "spn" => Ok(PolicyKind::Spn),
            "srt" => Ok(PolicyKind::Srt),
            "hrrn" => Ok(PolicyKind::Hrrn),
            _ => Err(Error::UnknownPolicy(s.to_owned())),
        }
    }
}

/// Resolve an operator-supplied policy name. Never falls through to a
/// default policy.
pub fn from_name(name: &str, quantum: Duration) -> Result<Box<dyn Policy>> {
    let kind: PolicyKind = name.parse()?;
    info!(policy = %kind, "using");
    Ok(kind.build(quantum))
}

/// Per-run mutable copy of one job, isolated from the input batch
#[derive(Debug, Clone)]
pub(crate) struct RunJob {
    pub spec: JobSpec,
    pub remaining: Duration,
    pub started: Option<Time>,
}

impl RunJob {
    pub fn new(spec: &JobSpec) -> Self {
        RunJob {
            spec: spec.clone(),
            remaining: spec.estimate,
            started: None,
        }
    }

    pub fn finished(&self) -> bool {
        self.remaining.is_zero()
    }

    pub fn arrived(&self, now: Time) -> bool {
        self.spec.arrival <= now
    }
}

/// Accumulates slices and per-job results while a policy runs
#[derive(Debug)]
pub(crate) struct PlanBuilder {
    policy: PolicyKind,
    slices: Vec<Slice>,
    jobs: Vec<ScheduledJob>,
}

impl PlanBuilder {
    pub fn new(policy: PolicyKind) -> Self {
        PlanBuilder {
            policy,
            slices: Vec::new(),
            jobs: Vec::new(),
        }
    }

    /// Record one stretch of execution; contiguous slices of the same job
    /// are merged, so SRT's unit steps collapse into maximal runs.
    pub fn slice(&mut self, job: JobId, start: Time, len: Duration) {
        if let Some(last) = self.slices.last_mut() {
            if last.job == job && last.end() == start {
                last.len = last.len + len;
                return;
            }
        }
        self.slices.push(Slice { job, start, len });
    }

    pub fn finish(&mut self, run: &RunJob, finish: Time) {
        debug_assert!(run.finished());
        let started = run.started.unwrap_or(run.spec.arrival);
        debug!(job = %run.spec.id, %started, %finish, "job finished");
        self.jobs.push(ScheduledJob {
            spec: run.spec.clone(),
            started,
            finish,
        });
    }

    pub fn build(mut self) -> ExecutionPlan {
        // report jobs in submission order regardless of completion order
        self.jobs.sort_by_key(|j| j.spec.id);
        ExecutionPlan {
            policy: self.policy,
            slices: self.slices,
            jobs: self.jobs,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    pub fn batch(entries: Vec<(&str, u64, u64)>) -> Batch {
        Batch::from_entries(entries).unwrap()
    }

    pub fn finish_of(plan: &ExecutionPlan, command: &str) -> Time {
        plan.jobs
            .iter()
            .find(|j| j.spec.command == command)
            .expect("job missing from plan")
            .finish
    }

    /// slice durations for each job must add up to its service estimate
    pub fn assert_slices_cover_estimates(plan: &ExecutionPlan) {
        for job in &plan.jobs {
            let total: u64 = plan.slices_for(job.spec.id).map(|s| s.len.0).sum();
            assert_eq!(total, job.spec.estimate.0, "slice total for {}", job.spec);
        }
    }

    /// no policy may finish a job earlier than serial execution allows,
    /// and no job may be lost or duplicated
    pub fn assert_plan_sound(batch: &Batch, plan: &ExecutionPlan) {
        assert_eq!(plan.jobs.len(), batch.len());
        for job in &plan.jobs {
            let spec = batch
                .jobs()
                .iter()
                .find(|s| s.id == job.spec.id)
                .expect("plan invented a job");
            assert_eq!(*spec, job.spec);
            assert!(job.finish >= job.spec.arrival + job.spec.estimate, "{}", job.spec);
            assert!(job.started >= job.spec.arrival);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_policy_is_an_error() {
        let err = from_name("lottery", DEFAULT_QUANTUM).unwrap_err();
        assert!(matches!(err, Error::UnknownPolicy(_)));
    }

    #[test]
    fn names_resolve_case_insensitively() {
        for (name, kind) in [
            ("fcfs", PolicyKind::Fcfs),
            ("RR", PolicyKind::RoundRobin),
            ("round-robin", PolicyKind::RoundRobin),
            ("Spn", PolicyKind::Spn),
            ("srt", PolicyKind::Srt),
            ("HRRN", PolicyKind::Hrrn),
        ]
        .iter()
        {
            assert_eq!(name.parse::<PolicyKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn empty_batch_yields_empty_plan_for_all_policies() {
        let batch = Batch::new(vec![]);
        for kind in PolicyKind::ALL.iter() {
            let plan = kind.build(DEFAULT_QUANTUM).schedule(&batch);
            assert!(plan.is_empty(), "{}", kind);
            assert!(plan.slices.is_empty(), "{}", kind);
        }
    }
}

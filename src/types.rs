use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::utils::prelude::*;

/// A point on the virtual clock, whole seconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[display("{0}")]
pub struct Time(pub u64);

/// A span of virtual time, whole seconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[display("{0}")]
pub struct Duration(pub u64);

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Self::Output {
        Time(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Time {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Time {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration(self.0 - rhs.0)
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Self) -> Self::Output {
        Duration(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration(self.0 - rhs.0)
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Duration {
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn to_std(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.0)
    }
}

/// Stable job identifier, assigned once at batch submission and carried
/// through scheduling, execution and persistence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[display("J{0}")]
pub struct JobId(pub u32);

/// One unit of declared work as submitted by the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: JobId,
    /// opaque command realized by the execution unit
    pub command: String,
    pub arrival: Time,
    pub estimate: Duration,
}

impl fmt::Display for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?}, @{}+{})", self.id, self.command, self.arrival, self.estimate)
    }
}

impl JobSpec {
    pub fn new(id: JobId, command: impl Into<String>, arrival: Time, estimate: Duration) -> Result<Self> {
        let command = command.into();
        if estimate.is_zero() {
            return Err(Error::InvalidJob {
                command,
                reason: "service estimate must be positive".into(),
            });
        }
        Ok(JobSpec {
            id,
            command,
            arrival,
            estimate,
        })
    }
}

/// An ordered set of jobs submitted together for one scheduling run.
///
/// The batch itself is immutable input: policies copy it into per-run
/// state and never mutate it, so repeated runs over the same batch
/// cannot interfere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    jobs: Vec<JobSpec>,
}

impl Batch {
    pub fn new(jobs: Vec<JobSpec>) -> Self {
        Batch { jobs }
    }

    /// Build a batch from `(command, arrival, estimate)` triples, assigning
    /// ids by submission order. Fails on the first malformed job.
    pub fn from_entries<S, I>(entries: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, u64, u64)>,
    {
        let jobs = entries
            .into_iter()
            .enumerate()
            .map(|(idx, (command, arrival, estimate))| {
                JobSpec::new(JobId(idx as u32), command, Time(arrival), Duration(estimate))
            })
            .collect::<Result<_>>()?;
        Ok(Batch { jobs })
    }

    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Jobs sorted by arrival time; the sort is stable so ties keep
    /// submission order.
    pub fn by_arrival(&self) -> Vec<JobSpec> {
        let mut jobs = self.jobs.clone();
        jobs.sort_by_key(|j| j.arrival);
        jobs
    }
}

/// One contiguous stretch of execution granted to a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display("{job}@{start}+{len}")]
pub struct Slice {
    pub job: JobId,
    pub start: Time,
    pub len: Duration,
}

impl Slice {
    pub fn end(&self) -> Time {
        self.start + self.len
    }
}

/// Scheduling result for a single job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub spec: JobSpec,
    /// first dispatch on the virtual clock
    pub started: Time,
    pub finish: Time,
}

/// The ordered, time-stamped plan produced by one policy over one batch.
///
/// Owned by the run that produced it; consumed by the metrics calculator
/// and replayed by the execution binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub policy: crate::policies::PolicyKind,
    /// slice log in virtual-time order; non-preemptive policies emit one
    /// slice per job
    pub slices: Vec<Slice>,
    /// per-job results, in submission order
    pub jobs: Vec<ScheduledJob>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn slices_for(&self, job: JobId) -> impl Iterator<Item = &Slice> {
        self.slices.iter().filter(move |s| s.job == job)
    }

    pub fn makespan(&self) -> Time {
        self.jobs
            .iter()
            .map(|j| j.finish)
            .max()
            .unwrap_or_default()
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExecutionPlan {{ policy: {}, jobs.len: {}, slices.len: {} }}",
            self.policy,
            self.jobs.len(),
            self.slices.len()
        )
    }
}

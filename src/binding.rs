//! Replays an execution plan against the execution provider.
//!
//! The binding is the only side-effecting stage: policies hand it a plan of
//! virtual-clock slices and it drives the matching pause/resume/stop calls,
//! optionally sleeping in real time so an observer sees unit states match
//! the simulated timeline. Lifecycle hiccups on live units are logged and
//! survived; only a unit that can never be created marks its job failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::policies::PolicyKind;
use crate::provider::{unit_name, ExecutionProvider, ImageRef, UnitHandle};
use crate::types::{Duration, ExecutionPlan, JobId, ScheduledJob, Slice, Time};
use crate::utils::prelude::*;

/// Whether replay blocks for the wall-clock equivalent of each slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    /// timestamps only, no sleeping
    Immediate,
    /// one real second per simulated second
    RealTime,
}

/// Result of driving one job's execution unit through its plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { job: JobId, finish: Time },
    /// the unit could never be created; sibling jobs are unaffected
    Failed { job: JobId, error: String },
}

impl JobOutcome {
    pub fn job(&self) -> JobId {
        match self {
            JobOutcome::Completed { job, .. } | JobOutcome::Failed { job, .. } => *job,
        }
    }
}

pub struct ExecutionBinding {
    provider: Arc<dyn ExecutionProvider>,
    pacing: Pacing,
    per_job_workers: bool,
}

impl ExecutionBinding {
    pub fn new(provider: Arc<dyn ExecutionProvider>, pacing: Pacing, per_job_workers: bool) -> Self {
        ExecutionBinding {
            provider,
            pacing,
            per_job_workers,
        }
    }

    /// Drive the whole plan to completion. Round Robin plans may run with
    /// one worker per job; everything else replays in lock-step with the
    /// simulated timeline.
    pub fn run(&self, plan: &ExecutionPlan) -> Vec<JobOutcome> {
        let _g = info_span!("binding", policy = %plan.policy, pacing = ?self.pacing).entered();
        if self.per_job_workers && plan.policy == PolicyKind::RoundRobin {
            self.replay_per_job(plan)
        } else {
            self.replay_lockstep(plan)
        }
    }

    fn sleep(&self, d: Duration) {
        if self.pacing == Pacing::RealTime && !d.is_zero() {
            thread::sleep(d.to_std());
        }
    }

    /// Remove any stale unit with this job's identity, build the image if
    /// needed, then create and start a fresh unit.
    fn first_dispatch(
        &self,
        job: &ScheduledJob,
        images: &mut HashMap<String, ImageRef>,
    ) -> Result<UnitHandle> {
        let name = unit_name(&job.spec.command);
        // failure to find or remove a leftover is not fatal, the create
        // will complain if the name is really taken
        match self.provider.find(&name) {
            Ok(Some(stale)) => best_effort(job.spec.id, self.provider.remove(&stale)),
            Ok(None) => {}
            Err(err) => warn!(job = %job.spec.id, %err, "stale unit lookup failed, assuming absent"),
        }

        let image = match images.get(&job.spec.command) {
            Some(image) => image.clone(),
            None => {
                let image = self.provider.ensure_image(&job.spec.command)?;
                images.insert(job.spec.command.clone(), image.clone());
                image
            }
        };

        self.provider.create_and_start(&image, &name)
    }

    /// The common path: one thread walks the slice log in order, so total
    /// wall-clock time equals total simulated time under real-time pacing.
    fn replay_lockstep(&self, plan: &ExecutionPlan) -> Vec<JobOutcome> {
        let specs: HashMap<JobId, &ScheduledJob> = plan.jobs.iter().map(|j| (j.spec.id, j)).collect();
        let mut remaining: HashMap<JobId, Duration> =
            plan.jobs.iter().map(|j| (j.spec.id, j.spec.estimate)).collect();
        let mut units: HashMap<JobId, Option<UnitHandle>> = HashMap::new();
        let mut images: HashMap<String, ImageRef> = HashMap::new();
        let mut outcomes: Vec<JobOutcome> = Vec::new();
        let mut active: Option<(JobId, UnitHandle)> = None;
        let mut now = Time(0);

        for slice in &plan.slices {
            let job = specs[&slice.job];

            // idle gap before this slice
            self.sleep(slice.start - now);

            // preemption boundary: park whatever was running
            if let Some((prev, handle)) = active.take() {
                if prev != slice.job {
                    best_effort(prev, self.provider.pause(&handle));
                }
            }

            if !units.contains_key(&slice.job) {
                // first dispatch of this job
                let handle = match self.first_dispatch(job, &mut images) {
                    Ok(handle) => Some(handle),
                    Err(err) => {
                        error!(job = %job.spec, %err, "unit could not be created, job marked failed");
                        outcomes.push(JobOutcome::Failed {
                            job: slice.job,
                            error: err.to_string(),
                        });
                        None
                    }
                };
                units.insert(slice.job, handle);
            } else if let Some(Some(handle)) = units.get(&slice.job) {
                best_effort(slice.job, self.provider.resume(handle));
            }
            // else: creation already failed; the timeline still advances
            // so sibling timestamps stay valid

            self.sleep(slice.len);
            now = slice.end();

            let left = remaining.get_mut(&slice.job).expect("slice for unknown job");
            *left -= slice.len;
            let handle = units.get(&slice.job).and_then(|h| h.clone());
            if left.is_zero() {
                if let Some(handle) = handle {
                    best_effort(slice.job, self.provider.stop(&handle));
                    best_effort(slice.job, self.provider.remove(&handle));
                    outcomes.push(JobOutcome::Completed {
                        job: slice.job,
                        finish: now,
                    });
                }
            } else if let Some(handle) = handle {
                active = Some((slice.job, handle));
            }
        }

        outcomes.sort_by_key(JobOutcome::job);
        outcomes
    }

    /// Round Robin only: one independent worker per job, each pacing its
    /// own unit by real-time sleeps with no shared mutable state.
    fn replay_per_job(&self, plan: &ExecutionPlan) -> Vec<JobOutcome> {
        let handles: Vec<_> = plan
            .jobs
            .iter()
            .map(|job| {
                let job = job.clone();
                let slices: Vec<Slice> = plan.slices_for(job.spec.id).copied().collect();
                let provider = Arc::clone(&self.provider);
                let pacing = self.pacing;
                thread::spawn(move || drive_one_job(&*provider, pacing, &job, &slices))
            })
            .collect();

        let mut outcomes: Vec<JobOutcome> = handles
            .into_iter()
            .map(|h| h.join().expect("job worker panicked"))
            .collect();
        outcomes.sort_by_key(JobOutcome::job);
        outcomes
    }
}

/// Worker body for [`ExecutionBinding::replay_per_job`]
fn drive_one_job(
    provider: &dyn ExecutionProvider,
    pacing: Pacing,
    job: &ScheduledJob,
    slices: &[Slice],
) -> JobOutcome {
    let sleep = |d: Duration| {
        if pacing == Pacing::RealTime && !d.is_zero() {
            thread::sleep(d.to_std());
        }
    };
    let _g = info_span!("worker", job = %job.spec.id).entered();

    // wait out our own timeline up to the first dispatch
    sleep(job.started - Time(0));

    let name = unit_name(&job.spec.command);
    let handle = (|| -> Result<UnitHandle> {
        match provider.find(&name) {
            Ok(Some(stale)) => best_effort(job.spec.id, provider.remove(&stale)),
            Ok(None) => {}
            Err(err) => warn!(job = %job.spec.id, %err, "stale unit lookup failed, assuming absent"),
        }
        let image = provider.ensure_image(&job.spec.command)?;
        provider.create_and_start(&image, &name)
    })();
    let handle = match handle {
        Ok(handle) => handle,
        Err(err) => {
            error!(job = %job.spec, %err, "unit could not be created, job marked failed");
            return JobOutcome::Failed {
                job: job.spec.id,
                error: err.to_string(),
            };
        }
    };

    for pair in slices.windows(2) {
        let (cur, next) = (pair[0], pair[1]);
        sleep(cur.len);
        best_effort(job.spec.id, provider.pause(&handle));
        sleep(next.start - cur.end());
        best_effort(job.spec.id, provider.resume(&handle));
    }
    if let Some(last) = slices.last() {
        sleep(last.len);
    }

    best_effort(job.spec.id, provider.stop(&handle));
    best_effort(job.spec.id, provider.remove(&handle));
    JobOutcome::Completed {
        job: job.spec.id,
        finish: job.finish,
    }
}

/// Downgrade a lifecycle failure to a warning; scheduling proceeds on the
/// simulated timeline regardless of the unit's OS-level state.
fn best_effort(job: JobId, res: Result<()>) {
    if let Err(err) = res {
        warn!(%job, %err, "lifecycle call failed, continuing");
    }
}

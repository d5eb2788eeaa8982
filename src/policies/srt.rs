use super::{PlanBuilder, Policy, PolicyKind, RunJob};
use crate::types::{Batch, Duration, ExecutionPlan, Time};
use crate::utils::prelude::*;

/// Shortest remaining time. Preemptive at one-time-unit granularity: every
/// unit the arrived job with the least remaining work runs, so a short new
/// arrival preempts a long job mid-flight. Ties go to the earliest arrival,
/// then submission order.
#[derive(Debug, Default)]
pub struct Srt;

const UNIT: Duration = Duration(1);

impl Policy for Srt {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Srt
    }

    #[instrument(level = "debug", skip(self, batch), fields(batch.len = batch.len()))]
    fn schedule(&self, batch: &Batch) -> ExecutionPlan {
        let mut plan = PlanBuilder::new(self.kind());
        let mut runs: Vec<RunJob> = batch.by_arrival().iter().map(RunJob::new).collect();
        let mut done = 0;
        let mut now = Time(0);

        while done < runs.len() {
            // min_by_key keeps the first of equal keys; runs are in
            // arrival-then-submission order
            let picked = runs
                .iter()
                .enumerate()
                .filter(|(_, r)| !r.finished() && r.arrived(now))
                .min_by_key(|(_, r)| r.remaining)
                .map(|(idx, _)| idx);

            match picked {
                Some(idx) => {
                    let run = &mut runs[idx];
                    if run.started.is_none() {
                        run.started = Some(now);
                    }
                    plan.slice(run.spec.id, now, UNIT);
                    now += UNIT;
                    run.remaining -= UNIT;
                    if run.finished() {
                        plan.finish(run, now);
                        done += 1;
                    }
                }
                // idle unit, nothing has arrived
                None => now += UNIT,
            }
        }

        plan.build()
    }
}

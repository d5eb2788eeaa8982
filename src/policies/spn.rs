use super::{PlanBuilder, Policy, PolicyKind, RunJob};
use crate::types::{Batch, ExecutionPlan, Time};
use crate::utils::prelude::*;

/// Shortest process next. Non-preemptive: of the jobs that have arrived,
/// the one with the smallest service estimate runs to completion. Ties go
/// to the earliest arrival, then submission order.
#[derive(Debug, Default)]
pub struct Spn;

impl Policy for Spn {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Spn
    }

    #[instrument(level = "debug", skip(self, batch), fields(batch.len = batch.len()))]
    fn schedule(&self, batch: &Batch) -> ExecutionPlan {
        let mut plan = PlanBuilder::new(self.kind());
        let mut runs: Vec<RunJob> = batch.by_arrival().iter().map(RunJob::new).collect();
        let mut done = 0;
        let mut now = Time(0);

        while done < runs.len() {
            // runs are in arrival-then-submission order, and min_by_key
            // keeps the first of equal keys, which is exactly the tie-break
            let picked = runs
                .iter()
                .enumerate()
                .filter(|(_, r)| !r.finished() && r.arrived(now))
                .min_by_key(|(_, r)| r.remaining)
                .map(|(idx, _)| idx);

            let idx = match picked {
                Some(idx) => idx,
                None => {
                    // nothing has arrived yet: advance to the next pending
                    // arrival
                    now = runs
                        .iter()
                        .filter(|r| !r.finished())
                        .map(|r| r.spec.arrival)
                        .min()
                        .expect("unfinished job must exist");
                    continue;
                }
            };

            let run = &mut runs[idx];
            run.started = Some(now);
            plan.slice(run.spec.id, now, run.spec.estimate);
            now += run.spec.estimate;
            run.remaining -= run.spec.estimate;
            plan.finish(run, now);
            done += 1;
        }

        plan.build()
    }
}

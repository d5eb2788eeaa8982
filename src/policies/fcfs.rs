use super::{PlanBuilder, Policy, PolicyKind, RunJob};
use crate::types::{Batch, ExecutionPlan, Time};
use crate::utils::prelude::*;

/// First-come-first-served. Jobs run to completion in arrival order;
/// nothing is ever reordered once started.
#[derive(Debug, Default)]
pub struct Fcfs;

impl Policy for Fcfs {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Fcfs
    }

    #[instrument(level = "debug", skip(self, batch), fields(batch.len = batch.len()))]
    fn schedule(&self, batch: &Batch) -> ExecutionPlan {
        let mut plan = PlanBuilder::new(self.kind());
        let mut now = Time(0);

        for spec in batch.by_arrival() {
            let mut run = RunJob::new(&spec);
            // idle until the job arrives
            let start = now.max(spec.arrival);
            run.started = Some(start);
            run.remaining -= spec.estimate;
            plan.slice(spec.id, start, spec.estimate);
            now = start + spec.estimate;
            plan.finish(&run, now);
        }

        plan.build()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[test]
    fn scenario_two_jobs() {
        // A(0,3) B(1,2) -> A finishes at 3, B at 5
        let batch = batch(vec![("A", 0, 3), ("B", 1, 2)]);
        let plan = Fcfs.schedule(&batch);

        assert_eq!(finish_of(&plan, "A"), Time(3));
        assert_eq!(finish_of(&plan, "B"), Time(5));
        assert_plan_sound(&batch, &plan);
    }

    #[test]
    fn idles_until_late_arrival() {
        let batch = batch(vec![("A", 10, 1)]);
        let plan = Fcfs.schedule(&batch);

        assert_eq!(plan.slices[0].start, Time(10));
        assert_eq!(finish_of(&plan, "A"), Time(11));
    }

    #[test]
    fn preserves_arrival_order() {
        let batch = batch(vec![("A", 0, 9), ("B", 1, 1), ("C", 2, 1)]);
        let plan = Fcfs.schedule(&batch);

        // if A arrives no later than B, A finishes no later than B
        let mut finishes: Vec<_> = plan.jobs.iter().map(|j| (j.spec.arrival, j.finish)).collect();
        finishes.sort_by_key(|(arrival, _)| *arrival);
        assert!(finishes.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_slices_cover_estimates(&plan);
    }

    #[test]
    fn one_slice_per_job() {
        let batch = batch(vec![("A", 0, 3), ("B", 0, 2), ("C", 7, 4)]);
        let plan = Fcfs.schedule(&batch);
        assert_eq!(plan.slices.len(), 3);
        for job in &plan.jobs {
            assert_eq!(plan.slices_for(job.spec.id).count(), 1);
            assert_eq!(job.finish - job.started, job.spec.estimate);
        }
    }
}

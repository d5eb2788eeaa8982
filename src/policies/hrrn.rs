use super::{PlanBuilder, Policy, PolicyKind, RunJob};
use crate::types::{Batch, ExecutionPlan, Time};
use crate::utils::prelude::*;

/// Highest response ratio next. Non-preemptive: of the arrived jobs, the
/// one with the largest `(wait + service) / service` runs to completion,
/// so long-waiting jobs eventually beat freshly arrived short ones.
#[derive(Debug, Default)]
pub struct Hrrn;

fn response_ratio(run: &RunJob, now: Time) -> f64 {
    let wait = (now - run.spec.arrival).0 as f64;
    let service = run.spec.estimate.0 as f64;
    // service > 0 is enforced at batch validation
    (wait + service) / service
}

impl Policy for Hrrn {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Hrrn
    }

    #[instrument(level = "debug", skip(self, batch), fields(batch.len = batch.len()))]
    fn schedule(&self, batch: &Batch) -> ExecutionPlan {
        let mut plan = PlanBuilder::new(self.kind());
        let mut runs: Vec<RunJob> = batch.by_arrival().iter().map(RunJob::new).collect();
        let mut done = 0;
        let mut now = Time(0);

        while done < runs.len() {
            // keep the first of equal ratios: runs are in arrival-then-
            // submission order, so a strict comparison is the tie-break
            let mut picked: Option<(usize, f64)> = None;
            for (idx, run) in runs.iter().enumerate() {
                if run.finished() || !run.arrived(now) {
                    continue;
                }
                let ratio = response_ratio(run, now);
                match picked {
                    Some((_, best)) if ratio <= best => {}
                    _ => picked = Some((idx, ratio)),
                }
            }

            let idx = match picked {
                Some((idx, ratio)) => {
                    debug!(job = %runs[idx].spec.id, ratio, "selected");
                    idx
                }
                None => {
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

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::types::{Duration, JobId};

    #[test]
    fn long_waiter_beats_fresh_short_job() {
        // by the time the processor frees up at 20, "old" has waited 20
        // units against an estimate of 10 (ratio 3.0), while the
        // just-arrived "fresh" is at ratio ~1.15; waiting wins
        let batch = batch(vec![("busy", 0, 20), ("old", 0, 10), ("fresh", 17, 2)]);
        let plan = Hrrn.schedule(&batch);

        assert!(finish_of(&plan, "old") < finish_of(&plan, "fresh"));
        assert_eq!(finish_of(&plan, "old"), Time(30));
        assert_plan_sound(&batch, &plan);
    }

    #[test]
    fn selected_job_has_maximal_ratio() {
        let batch = batch(vec![("a", 0, 4), ("b", 1, 6), ("c", 2, 2), ("d", 3, 8)]);
        let plan = Hrrn.schedule(&batch);

        // replay the decision points and check the winner's ratio
        let mut runs: Vec<RunJob> = batch.by_arrival().iter().map(RunJob::new).collect();
        for slice in &plan.slices {
            let best = runs
                .iter()
                .filter(|r| !r.finished() && r.arrived(slice.start))
                .map(|r| response_ratio(r, slice.start))
                .fold(f64::MIN, f64::max);
            let winner = runs.iter_mut().find(|r| r.spec.id == slice.job).unwrap();
            assert!((response_ratio(winner, slice.start) - best).abs() < 1e-9);
            winner.remaining -= winner.spec.estimate;
        }
    }

    #[test]
    fn equal_ratio_breaks_by_arrival() {
        // both waiting since 0 with equal estimates: equal ratios, the
        // earlier submission runs first
        let batch = batch(vec![("busy", 0, 5), ("x", 1, 3), ("y", 1, 3)]);
        let plan = Hrrn.schedule(&batch);

        let order: Vec<_> = plan.slices.iter().map(|s| s.job).collect();
        assert_eq!(order, vec![JobId(0), JobId(1), JobId(2)]);
    }

    #[test]
    fn ratio_uses_real_division() {
        let run = RunJob::new(&crate::types::JobSpec {
            id: JobId(0),
            command: "x".into(),
            arrival: Time(0),
            estimate: Duration(4),
        });
        assert!((response_ratio(&run, Time(2)) - 1.5).abs() < f64::EPSILON);
    }
}

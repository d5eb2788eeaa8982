use std::collections::VecDeque;

use super::{PlanBuilder, Policy, PolicyKind, RunJob};
use crate::types::{Batch, Duration, ExecutionPlan, Time};
use crate::utils::prelude::*;

/// Round robin with a fixed quantum. Preemptive: the head of the ready
/// queue runs for at most one quantum, then newly arrived jobs are admitted
/// before the preempted job re-queues.
#[derive(Debug)]
pub struct RoundRobin {
    quantum: Duration,
}

impl RoundRobin {
    pub fn new(quantum: Duration) -> Self {
        assert!(!quantum.is_zero(), "quantum must be positive");
        RoundRobin { quantum }
    }
}

impl Policy for RoundRobin {
    fn kind(&self) -> PolicyKind {
        PolicyKind::RoundRobin
    }

    #[instrument(
        level = "debug",
        skip(self, batch),
        fields(quantum = %self.quantum, batch.len = batch.len())
    )]
    fn schedule(&self, batch: &Batch) -> ExecutionPlan {
        let mut plan = PlanBuilder::new(self.kind());
        let mut runs: Vec<RunJob> = batch.by_arrival().iter().map(RunJob::new).collect();
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut next_admit = 0;
        let mut now = Time(0);

        // admit everything that has arrived by `now`, in arrival order
        let admit = |queue: &mut VecDeque<usize>, next_admit: &mut usize, runs: &[RunJob], now: Time| {
            while *next_admit < runs.len() && runs[*next_admit].arrived(now) {
                queue.push_back(*next_admit);
                *next_admit += 1;
            }
        };

        loop {
            if queue.is_empty() {
                if next_admit == runs.len() {
                    break;
                }
                // queue drained but jobs are still to come: jump to the
                // next arrival
                now = now.max(runs[next_admit].spec.arrival);
                admit(&mut queue, &mut next_admit, &runs, now);
                continue;
            }

            let idx = queue.pop_front().unwrap();
            let turn = self.quantum.min(runs[idx].remaining);
            if runs[idx].started.is_none() {
                runs[idx].started = Some(now);
            }
            plan.slice(runs[idx].spec.id, now, turn);
            now += turn;
            runs[idx].remaining -= turn;

            // arrivals during the slice go ahead of the preempted job
            admit(&mut queue, &mut next_admit, &runs, now);

            if runs[idx].finished() {
                plan.finish(&runs[idx], now);
            } else {
                queue.push_back(idx);
            }
        }

        plan.build()
    }
}

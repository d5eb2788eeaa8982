//! Turnaround and response statistics over a completed plan.

use serde::{Deserialize, Serialize};

use crate::policies::PolicyKind;
use crate::types::{Duration, ExecutionPlan, JobId, Time};
use crate::utils::prelude::*;

/// Per-job figures derived once `finish_time` is known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetrics {
    pub job: JobId,
    pub finish: Time,
    /// finish - arrival
    pub turnaround: Duration,
    /// Total wait: finish - arrival - estimate. Note this is not the
    /// classical time-to-first-dispatch; the name is kept for
    /// compatibility with the stored history.
    pub response: Duration,
}

/// Aggregate report over one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub policy: PolicyKind,
    pub jobs: Vec<JobMetrics>,
    pub avg_turnaround: f64,
    pub avg_response: f64,
}

/// Pure function over a completed plan. Recomputing on an unchanged plan
/// is idempotent.
pub fn compute(plan: &ExecutionPlan) -> Result<Report> {
    if plan.is_empty() {
        return Err(Error::EmptyBatch);
    }

    let jobs: Vec<JobMetrics> = plan
        .jobs
        .iter()
        .map(|j| JobMetrics {
            job: j.spec.id,
            finish: j.finish,
            turnaround: j.finish - j.spec.arrival,
            response: j.finish - j.spec.arrival - j.spec.estimate,
        })
        .collect();

    let n = jobs.len() as f64;
    let avg_turnaround = jobs.iter().map(|m| m.turnaround.0 as f64).sum::<f64>() / n;
    let avg_response = jobs.iter().map(|m| m.response.0 as f64).sum::<f64>() / n;

    debug!(policy = %plan.policy, avg_turnaround, avg_response, "metrics computed");

    Ok(Report {
        policy: plan.policy,
        jobs,
        avg_turnaround,
        avg_response,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::policies::{Fcfs, Policy};
    use crate::types::Batch;

    fn fcfs_plan() -> ExecutionPlan {
        let batch = Batch::from_entries(vec![("A", 0, 3), ("B", 1, 2)]).unwrap();
        Fcfs.schedule(&batch)
    }

    #[test]
    fn scenario_averages() {
        // A: turnaround 3; B: finishes at 5, turnaround 4
        let report = compute(&fcfs_plan()).unwrap();
        assert_relative_eq!(report.avg_turnaround, 3.5);
        // waits: A 0, B 2
        assert_relative_eq!(report.avg_response, 1.0);
    }

    #[test]
    fn response_is_total_wait() {
        let report = compute(&fcfs_plan()).unwrap();
        let b = report.jobs.iter().find(|m| m.job == JobId(1)).unwrap();
        assert_eq!(b.turnaround, Duration(4));
        assert_eq!(b.response, Duration(2));
    }

    #[test]
    fn empty_plan_is_rejected() {
        let plan = Fcfs.schedule(&Batch::new(vec![]));
        assert!(matches!(compute(&plan), Err(Error::EmptyBatch)));
    }

    #[test]
    fn recompute_is_idempotent() {
        let plan = fcfs_plan();
        assert_eq!(compute(&plan).unwrap(), compute(&plan).unwrap());
    }

    #[test]
    fn average_is_arithmetic_mean() {
        let batch = Batch::from_entries(vec![("A", 0, 1), ("B", 0, 2), ("C", 0, 3)]).unwrap();
        let report = compute(&Fcfs.schedule(&batch)).unwrap();
        let mean = report.jobs.iter().map(|m| m.turnaround.0 as f64).sum::<f64>() / 3.0;
        assert_relative_eq!(report.avg_turnaround, mean);
    }
}

//! End-to-end properties that must hold for every policy.

use schedsim::metrics;
use schedsim::policies::{PolicyKind, DEFAULT_QUANTUM};
use schedsim::types::Batch;

fn workload() -> Batch {
    Batch::from_entries(vec![
        ("build", 0, 6),
        ("lint", 1, 2),
        ("test", 1, 4),
        ("deploy", 9, 3),
        ("notify", 9, 1),
    ])
    .unwrap()
}

#[test]
fn no_policy_beats_serial_execution() {
    let batch = workload();
    for kind in PolicyKind::ALL.iter() {
        let plan = kind.build(DEFAULT_QUANTUM).schedule(&batch);
        for job in &plan.jobs {
            assert!(
                job.finish >= job.spec.arrival + job.spec.estimate,
                "{} finished {} too early under {}",
                job.spec,
                job.finish,
                kind
            );
        }
    }
}

#[test]
fn no_policy_loses_or_duplicates_jobs() {
    let batch = workload();
    for kind in PolicyKind::ALL.iter() {
        let plan = kind.build(DEFAULT_QUANTUM).schedule(&batch);
        let mut planned: Vec<_> = plan.jobs.iter().map(|j| j.spec.clone()).collect();
        planned.sort_by_key(|s| s.id);
        let mut submitted = batch.jobs().to_vec();
        submitted.sort_by_key(|s| s.id);
        assert_eq!(planned, submitted, "{}", kind);
    }
}

#[test]
fn slice_logs_account_for_every_second_of_service() {
    let batch = workload();
    for kind in PolicyKind::ALL.iter() {
        let plan = kind.build(DEFAULT_QUANTUM).schedule(&batch);
        for job in &plan.jobs {
            let total: u64 = plan
                .slices
                .iter()
                .filter(|s| s.job == job.spec.id)
                .map(|s| s.len.0)
                .sum();
            assert_eq!(total, job.spec.estimate.0, "{} under {}", job.spec, kind);
        }
    }
}

#[test]
fn slices_never_overlap_on_the_single_processor() {
    let batch = workload();
    for kind in PolicyKind::ALL.iter() {
        let plan = kind.build(DEFAULT_QUANTUM).schedule(&batch);
        for pair in plan.slices.windows(2) {
            assert!(
                pair[0].end() <= pair[1].start,
                "{} and {} overlap under {}",
                pair[0],
                pair[1],
                kind
            );
        }
    }
}

#[test]
fn metrics_agree_with_plan_for_every_policy() {
    let batch = workload();
    for kind in PolicyKind::ALL.iter() {
        let plan = kind.build(DEFAULT_QUANTUM).schedule(&batch);
        let report = metrics::compute(&plan).unwrap();
        assert_eq!(report.policy, *kind);
        assert_eq!(report.jobs.len(), batch.len());
        for (m, j) in report.jobs.iter().zip(plan.jobs.iter()) {
            assert_eq!(m.job, j.spec.id);
            assert_eq!(m.turnaround, j.finish - j.spec.arrival);
        }
    }
}

pub mod binding;
pub mod config;
pub mod metrics;
pub mod policies;
pub mod provider;
pub mod store;
pub mod types;
pub mod utils;

use std::sync::Arc;

use crate::binding::{ExecutionBinding, JobOutcome, Pacing};
use crate::config::SimConfig;
use crate::metrics::Report;
use crate::store::{BatchId, Store};
use crate::types::{Batch, ExecutionPlan};
use crate::utils::prelude::*;

/// Per-invocation overrides on top of the configured binding behavior
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOptions {
    pub pacing: Option<Pacing>,
    pub per_job_workers: Option<bool>,
}

/// Schedule a batch without touching any external collaborator: pure
/// virtual-clock simulation plus metrics.
pub fn simulate(batch: &Batch, policy_name: &str) -> Result<(ExecutionPlan, Report)> {
    let cfg = SimConfig::fetch()?;
    let policy = policies::from_name(policy_name, cfg.scheduler.quantum())?;
    let plan = policy.schedule(batch);
    let report = metrics::compute(&plan)?;
    Ok((plan, report))
}

/// Run one saved batch under one policy end to end: schedule, replay the
/// plan against the execution provider, then persist the computed metrics.
pub fn run_batch(batch_id: BatchId, policy_name: &str, opts: RunOptions) -> Result<Report> {
    let _g = info_span!("run", batch = %batch_id, policy = policy_name).entered();

    let cfg = SimConfig::fetch()?;
    // an unrecognized policy is surfaced before anything else happens
    let policy = policies::from_name(policy_name, cfg.scheduler.quantum())?;

    let store = Store::open(&cfg.store.path);
    let batch = store.get_batch(batch_id)?.to_batch()?;

    // pure scheduling pass
    let plan = policy.schedule(&batch);
    info!(%plan, "plan computed");
    let report = metrics::compute(&plan)?;

    // replay the plan against real execution units
    let provider = Arc::from(provider::from_config(&cfg.provider));
    let binding = ExecutionBinding::new(
        provider,
        opts.pacing.unwrap_or(cfg.binding.pacing),
        opts.per_job_workers.unwrap_or(cfg.binding.per_job_workers),
    );
    let outcomes = binding.run(&plan);
    for outcome in &outcomes {
        if let JobOutcome::Failed { job, error } = outcome {
            warn!(%job, %error, "job failed during execution; its metrics reflect the simulated timeline");
        }
    }

    // persist what we learned
    store.update_batch_metrics(batch_id, report.policy, report.avg_turnaround, report.avg_response)?;
    for m in &report.jobs {
        store.update_job_metrics(batch_id, m.job, m.finish, m.turnaround, m.response)?;
    }

    Ok(report)
}

/// Validate and persist a batch of `(command, arrival, estimate)` triples
pub fn submit_batch<S, I>(entries: I) -> Result<BatchId>
where
    S: Into<String>,
    I: IntoIterator<Item = (S, u64, u64)>,
{
    let cfg = SimConfig::fetch()?;
    let batch = Batch::from_entries(entries)?;
    Store::open(&cfg.store.path).save_batch(&batch)
}

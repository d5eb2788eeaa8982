//! File-backed persistence for submitted batches and computed metrics.
//!
//! One JSON document holds every saved batch together with its run history;
//! each call loads, mutates and rewrites the whole document. The store is a
//! single external resource, so no pooling or sharing is attempted.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::policies::PolicyKind;
use crate::types::{Batch, Duration, JobId, JobSpec, Time};
use crate::utils::prelude::*;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[display("B{0}")]
pub struct BatchId(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedJob {
    pub id: JobId,
    pub command: String,
    pub arrival: Time,
    pub estimate: Duration,
    /// written by the most recent run touching this job
    #[serde(default)]
    pub finish: Option<Time>,
    #[serde(default)]
    pub turnaround: Option<Duration>,
    #[serde(default)]
    pub response: Option<Duration>,
}

/// Aggregate figures from one completed run over a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub policy: PolicyKind,
    pub avg_turnaround: f64,
    pub avg_response: f64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedBatch {
    pub id: BatchId,
    pub submitted: DateTime<Utc>,
    pub jobs: Vec<SavedJob>,
    #[serde(default)]
    pub runs: Vec<RunRecord>,
}

impl SavedBatch {
    /// Reconstruct the immutable input batch, re-validating timings
    pub fn to_batch(&self) -> Result<Batch> {
        let jobs = self
            .jobs
            .iter()
            .map(|j| JobSpec::new(j.id, j.command.clone(), j.arrival, j.estimate))
            .collect::<Result<_>>()?;
        Ok(Batch::new(jobs))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    next_batch: u32,
    batches: Vec<SavedBatch>,
}

pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Store { path: path.into() }
    }

    fn load(&self) -> Result<StoreData> {
        if !self.path.exists() {
            return Ok(StoreData::default());
        }
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn persist(&self, data: &StoreData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(data)?)?;
        Ok(())
    }

    pub fn save_batch(&self, batch: &Batch) -> Result<BatchId> {
        let mut data = self.load()?;
        let id = BatchId(data.next_batch);
        data.next_batch += 1;
        data.batches.push(SavedBatch {
            id,
            submitted: Utc::now(),
            jobs: batch
                .jobs()
                .iter()
                .map(|j| SavedJob {
                    id: j.id,
                    command: j.command.clone(),
                    arrival: j.arrival,
                    estimate: j.estimate,
                    finish: None,
                    turnaround: None,
                    response: None,
                })
                .collect(),
            runs: Vec::new(),
        });
        self.persist(&data)?;
        info!(%id, jobs = batch.len(), "batch saved");
        Ok(id)
    }

    pub fn load_batches(&self) -> Result<Vec<SavedBatch>> {
        Ok(self.load()?.batches)
    }

    pub fn get_batch(&self, id: BatchId) -> Result<SavedBatch> {
        self.load()?
            .batches
            .into_iter()
            .find(|b| b.id == id)
            .ok_or(Error::NoSuchBatch(id.0))
    }

    pub fn update_batch_metrics(
        &self,
        id: BatchId,
        policy: PolicyKind,
        avg_turnaround: f64,
        avg_response: f64,
    ) -> Result<()> {
        let mut data = self.load()?;
        let batch = data
            .batches
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(Error::NoSuchBatch(id.0))?;
        batch.runs.push(RunRecord {
            policy,
            avg_turnaround,
            avg_response,
            at: Utc::now(),
        });
        self.persist(&data)
    }

    pub fn update_job_metrics(
        &self,
        id: BatchId,
        job: JobId,
        finish: Time,
        turnaround: Duration,
        response: Duration,
    ) -> Result<()> {
        let mut data = self.load()?;
        let batch = data
            .batches
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(Error::NoSuchBatch(id.0))?;
        if let Some(saved) = batch.jobs.iter_mut().find(|j| j.id == job) {
            saved.finish = Some(finish);
            saved.turnaround = Some(turnaround);
            saved.response = Some(response);
        }
        self.persist(&data)
    }

    /// Drop all saved state; invoked when the operator exits the prompt loop
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_store() -> Store {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("schedsim-store-{}-{}.json", std::process::id(), n));
        let _ = fs::remove_file(&path);
        Store::open(path)
    }

    fn sample_batch() -> Batch {
        Batch::from_entries(vec![("A", 0, 3), ("B", 1, 2)]).unwrap()
    }

    #[test]
    fn save_and_reload_roundtrips() {
        let store = temp_store();
        let id = store.save_batch(&sample_batch()).unwrap();

        let batches = store.load_batches().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].id, id);
        assert_eq!(batches[0].to_batch().unwrap(), sample_batch());

        store.clear().unwrap();
    }

    #[test]
    fn batch_ids_are_sequential() {
        let store = temp_store();
        let a = store.save_batch(&sample_batch()).unwrap();
        let b = store.save_batch(&sample_batch()).unwrap();
        assert_eq!(b.0, a.0 + 1);
        store.clear().unwrap();
    }

    #[test]
    fn metrics_updates_stick() {
        let store = temp_store();
        let id = store.save_batch(&sample_batch()).unwrap();

        store
            .update_batch_metrics(id, PolicyKind::Fcfs, 3.5, 1.0)
            .unwrap();
        store
            .update_job_metrics(id, JobId(1), Time(5), Duration(4), Duration(2))
            .unwrap();

        let batch = store.get_batch(id).unwrap();
        assert_eq!(batch.runs.len(), 1);
        assert_eq!(batch.runs[0].policy, PolicyKind::Fcfs);
        let job = batch.jobs.iter().find(|j| j.id == JobId(1)).unwrap();
        assert_eq!(job.finish, Some(Time(5)));
        assert_eq!(job.turnaround, Some(Duration(4)));

        store.clear().unwrap();
    }

    #[test]
    fn unknown_batch_is_an_error() {
        let store = temp_store();
        assert!(matches!(store.get_batch(BatchId(7)), Err(Error::NoSuchBatch(7))));
    }

    #[test]
    fn clear_wipes_everything() {
        let store = temp_store();
        store.save_batch(&sample_batch()).unwrap();
        store.clear().unwrap();
        assert!(store.load_batches().unwrap().is_empty());
    }
}

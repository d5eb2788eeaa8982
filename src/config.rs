use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::binding::Pacing;
use crate::provider::ProviderConfig;
use crate::types::Duration;
use crate::utils::prelude::*;

#[derive(Debug, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Round Robin quantum, seconds
    pub quantum: u64,
}

impl SchedulerConfig {
    pub fn quantum(&self) -> Duration {
        Duration(self.quantum)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BindingConfig {
    pub pacing: Pacing,
    /// Round Robin only: one worker thread per job instead of the
    /// lock-step replay
    #[serde(default)]
    pub per_job_workers: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StoreConfig {
    pub path: PathBuf,
}

/// The typed view over the global application config
#[derive(Debug, Deserialize, Serialize)]
pub struct SimConfig {
    pub scheduler: SchedulerConfig,
    pub binding: BindingConfig,
    pub provider: ProviderConfig,
    pub store: StoreConfig,
}

impl SimConfig {
    pub fn fetch() -> Result<Self> {
        config().fetch()
    }
}

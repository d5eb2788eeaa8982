//! The execution provider capability surface.
//!
//! The scheduler core only needs create/start/pause/resume/stop/remove on
//! named units; how images are built is the provider's business. Unit and
//! image names are deterministic functions of the job command so re-runs
//! target the same unit identity.

use parse_display::Display;

use crate::utils::prelude::*;

mod docker;

pub use docker::DockerCli;

/// Opaque handle for a built or retrieved image
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{0}")]
pub struct ImageRef(pub String);

/// Deterministic unit identity derived from a command
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{0}")]
pub struct UnitName(pub String);

/// A provider-issued handle to a live unit
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{0}")]
pub struct UnitHandle(pub String);

/// Lifecycle operations the binding drives. Implementations are expected
/// to be synchronous; retries and timeouts are theirs to manage.
pub trait ExecutionProvider: Send + Sync {
    /// Build or retrieve the image realizing `command`
    fn ensure_image(&self, command: &str) -> Result<ImageRef>;

    fn create_and_start(&self, image: &ImageRef, unit: &UnitName) -> Result<UnitHandle>;

    fn pause(&self, unit: &UnitHandle) -> Result<()>;
    fn resume(&self, unit: &UnitHandle) -> Result<()>;
    fn stop(&self, unit: &UnitHandle) -> Result<()>;
    fn remove(&self, unit: &UnitHandle) -> Result<()>;

    /// Look a unit up by name; absence is not an error
    fn find(&self, unit: &UnitName) -> Result<Option<UnitHandle>>;
}

/// FNV-1a content hash of the command, stable across runs
fn content_hash(command: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in command.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

pub fn unit_name(command: &str) -> UnitName {
    UnitName(format!("schedsim-unit-{:016x}", content_hash(command)))
}

pub fn image_tag(command: &str) -> String {
    format!("schedsim-image-{:016x}", content_hash(command))
}

/// Simulation-only provider: every lifecycle call succeeds without touching
/// anything, so runs produce timestamps and logs but no real units.
#[derive(Debug, Default)]
pub struct NullProvider;

impl ExecutionProvider for NullProvider {
    fn ensure_image(&self, command: &str) -> Result<ImageRef> {
        Ok(ImageRef(image_tag(command)))
    }

    fn create_and_start(&self, image: &ImageRef, unit: &UnitName) -> Result<UnitHandle> {
        debug!(%image, %unit, "start (noop)");
        Ok(UnitHandle(unit.0.clone()))
    }

    fn pause(&self, unit: &UnitHandle) -> Result<()> {
        debug!(%unit, "pause (noop)");
        Ok(())
    }

    fn resume(&self, unit: &UnitHandle) -> Result<()> {
        debug!(%unit, "resume (noop)");
        Ok(())
    }

    fn stop(&self, unit: &UnitHandle) -> Result<()> {
        debug!(%unit, "stop (noop)");
        Ok(())
    }

    fn remove(&self, unit: &UnitHandle) -> Result<()> {
        debug!(%unit, "remove (noop)");
        Ok(())
    }

    fn find(&self, _unit: &UnitName) -> Result<Option<UnitHandle>> {
        Ok(None)
    }
}

/// Provider choice, from the `provider` config section
#[derive(Debug, serde::Deserialize, serde::Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Null,
    Docker {
        #[serde(default = "default_docker_binary")]
        binary: String,
    },
}

fn default_docker_binary() -> String {
    "docker".into()
}

pub fn from_config(cfg: &ProviderConfig) -> Box<dyn ExecutionProvider> {
    match cfg {
        ProviderConfig::Null => Box::new(NullProvider),
        ProviderConfig::Docker { binary } => Box::new(DockerCli::new(binary.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_names_are_deterministic() {
        assert_eq!(unit_name("sleep 30"), unit_name("sleep 30"));
        assert_ne!(unit_name("sleep 30"), unit_name("sleep 31"));
    }

    #[test]
    fn image_tag_tracks_command_content() {
        assert_eq!(image_tag("echo hi"), image_tag("echo hi"));
        assert_ne!(image_tag("echo hi"), image_tag("echo ho"));
    }
}

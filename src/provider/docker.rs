use std::io::Write;
use std::process::{Command, Stdio};

use super::{image_tag, ExecutionProvider, ImageRef, UnitHandle, UnitName};
use crate::utils::prelude::*;

/// Drives a local Docker daemon through the `docker` binary.
///
/// Images are built from a generated one-off Dockerfile and tagged by the
/// content hash of the command, so identical commands reuse the image.
#[derive(Debug)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: String) -> Self {
        DockerCli { binary }
    }

    fn dockerfile(command: &str) -> String {
        format!("FROM ubuntu:latest\nCMD {}\n", command)
    }

    /// Run the docker binary, returning trimmed stdout on success and the
    /// collected stderr as the error reason otherwise.
    fn invoke(&self, args: &[&str], stdin: Option<&str>) -> std::result::Result<String, String> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| e.to_string())?;
        if let Some(input) = stdin {
            child
                .stdin
                .take()
                .expect("stdin was piped")
                .write_all(input.as_bytes())
                .map_err(|e| e.to_string())?;
        }
        let out = child.wait_with_output().map_err(|e| e.to_string())?;
        if out.status.success() {
            Ok(String::from_utf8_lossy(&out.stdout).trim().to_owned())
        } else {
            Err(String::from_utf8_lossy(&out.stderr).trim().to_owned())
        }
    }
}

impl ExecutionProvider for DockerCli {
    fn ensure_image(&self, command: &str) -> Result<ImageRef> {
        let tag = image_tag(command);
        if self.invoke(&["image", "inspect", &tag], None).is_ok() {
            debug!(%tag, "image already built");
            return Ok(ImageRef(tag));
        }

        info!(%tag, %command, "building image");
        self.invoke(&["build", "-t", &tag, "-"], Some(&Self::dockerfile(command)))
            .map_err(|reason| Error::ExecutionCreate {
                unit: tag.clone(),
                reason,
            })?;
        Ok(ImageRef(tag))
    }

    fn create_and_start(&self, image: &ImageRef, unit: &UnitName) -> Result<UnitHandle> {
        let id = self
            .invoke(&["run", "-d", "--name", &unit.0, &image.0], None)
            .map_err(|reason| Error::ExecutionCreate {
                unit: unit.0.clone(),
                reason,
            })?;
        info!(%unit, container = %id, "unit started");
        Ok(UnitHandle(id))
    }

    fn pause(&self, unit: &UnitHandle) -> Result<()> {
        self.invoke(&["pause", &unit.0], None)
            .map(drop)
            .map_err(|reason| Error::ExecutionState {
                unit: unit.0.clone(),
                op: "pause",
                reason,
            })
    }

    fn resume(&self, unit: &UnitHandle) -> Result<()> {
        self.invoke(&["unpause", &unit.0], None)
            .map(drop)
            .map_err(|reason| Error::ExecutionState {
                unit: unit.0.clone(),
                op: "resume",
                reason,
            })
    }

    fn stop(&self, unit: &UnitHandle) -> Result<()> {
        self.invoke(&["stop", &unit.0], None)
            .map(drop)
            .map_err(|reason| Error::ExecutionState {
                unit: unit.0.clone(),
                op: "stop",
                reason,
            })
    }

    fn remove(&self, unit: &UnitHandle) -> Result<()> {
        self.invoke(&["rm", "-f", &unit.0], None)
            .map(drop)
            .map_err(|reason| Error::ExecutionState {
                unit: unit.0.clone(),
                op: "remove",
                reason,
            })
    }

    fn find(&self, unit: &UnitName) -> Result<Option<UnitHandle>> {
        let filter = format!("name=^{}$", unit.0);
        match self.invoke(&["ps", "-aq", "--filter", &filter], None) {
            Ok(id) if id.is_empty() => Ok(None),
            Ok(id) => Ok(Some(UnitHandle(id))),
            // a failing lookup is treated as "already absent"
            Err(reason) => {
                warn!(%unit, %reason, "unit lookup failed, assuming absent");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dockerfile_embeds_command() {
        let df = DockerCli::dockerfile("sleep 30");
        assert!(df.starts_with("FROM ubuntu:latest"));
        assert!(df.contains("CMD sleep 30"));
    }
}

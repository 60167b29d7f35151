//! Run a command inside an extracted image root.
//!
//! The child is spawned with `chroot(root)` and `chdir("/")` applied between
//! fork and exec. With PID isolation the calling process first moves its
//! future children into a fresh PID namespace, so the command sees itself as
//! PID 1. Both steps need root privileges and are only available on Linux.

use crate::error::{RegistryError, Result};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SandboxCommand {
    pub root: PathBuf,
    pub command: String,
    pub args: Vec<String>,
    pub isolate_pid: bool,
}

/// Captured result of a sandboxed command
#[derive(Debug)]
pub struct SandboxOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: ExitStatus,
}

impl SandboxOutput {
    /// Exit code, or 128 + signal number when the command was killed
    pub fn exit_code(&self) -> i32 {
        if let Some(code) = self.status.code() {
            return code;
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = self.status.signal() {
                return 128 + signal;
            }
        }
        1
    }
}

impl SandboxCommand {
    pub fn new(root: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            command: command.into(),
            args: Vec::new(),
            isolate_pid: true,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_isolate_pid(mut self, isolate_pid: bool) -> Self {
        self.isolate_pid = isolate_pid;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(RegistryError::Validation(
                "Sandbox command cannot be empty".to_string(),
            ));
        }
        if !self.root.is_dir() {
            return Err(RegistryError::Validation(format!(
                "Sandbox root is not a directory: {}",
                self.root.display()
            )));
        }
        Ok(())
    }

    /// Run the command to completion and capture its output
    pub async fn run(&self) -> Result<SandboxOutput> {
        self.validate()?;
        info!(root = %self.root.display(), command = %self.command, isolate_pid = self.isolate_pid, "running sandboxed command");
        let output = imp::run(self).await?;
        debug!(status = %output.status, stdout = output.stdout.len(), stderr = output.stderr.len(), "sandboxed command exited");
        Ok(output)
    }
}

#[cfg(target_os = "linux")]
mod imp {
    use super::{SandboxCommand, SandboxOutput};
    use crate::error::{RegistryError, Result};
    use std::ffi::CString;
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::process::CommandExt;
    use std::process::Command;
    use std::thread;
    use tokio::sync::oneshot;

    // unshare(CLONE_NEWPID) sticks to the calling thread, so the namespace
    // switch and the fork happen on a thread that exits right after.
    pub(super) async fn run(sandbox: &SandboxCommand) -> Result<SandboxOutput> {
        let sandbox = sandbox.clone();
        let (tx, rx) = oneshot::channel();
        thread::Builder::new()
            .name("sandbox-exec".to_string())
            .spawn(move || {
                let _ = tx.send(run_on_thread(&sandbox));
            })
            .map_err(|e| RegistryError::Sandbox(format!("Failed to start sandbox thread: {}", e)))?;

        rx.await
            .map_err(|_| RegistryError::Sandbox("Sandbox thread exited without a result".to_string()))?
    }

    fn run_on_thread(sandbox: &SandboxCommand) -> Result<SandboxOutput> {
        let root = CString::new(sandbox.root.as_os_str().as_bytes())
            .map_err(|_| RegistryError::Validation("Sandbox root contains a NUL byte".to_string()))?;

        if sandbox.isolate_pid {
            // SAFETY: plain syscall; it only affects children forked by this thread.
            if unsafe { libc::unshare(libc::CLONE_NEWPID) } != 0 {
                let err = io::Error::last_os_error();
                return Err(RegistryError::Sandbox(format!("unshare(CLONE_NEWPID) failed: {}", err)));
            }
        }

        let mut cmd = Command::new(&sandbox.command);
        cmd.args(&sandbox.args);

        // SAFETY: the closure only calls async-signal-safe libc functions on
        // memory allocated before the fork.
        unsafe {
            cmd.pre_exec(move || {
                if libc::chroot(root.as_ptr()) != 0 {
                    return Err(io::Error::last_os_error());
                }
                if libc::chdir(c"/".as_ptr()) != 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let output = cmd.output().map_err(|e| {
            RegistryError::Sandbox(format!("Failed to run {}: {}", sandbox.command, e))
        })?;

        Ok(SandboxOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            status: output.status,
        })
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use super::{SandboxCommand, SandboxOutput};
    use crate::error::{RegistryError, Result};

    pub(super) async fn run(_sandbox: &SandboxCommand) -> Result<SandboxOutput> {
        Err(RegistryError::Sandbox(
            "Sandboxed execution is only supported on Linux".to_string(),
        ))
    }
}

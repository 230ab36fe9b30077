//! Unix child process management for PTY.
//!
//! This module spawns the program under test with its standard streams bound
//! to the PTY slave and tracks its lifecycle. The child always leads its own
//! process group, so signals can be delivered to it and to every job it
//! started in one call.

use std::ffi::OsStr;
use std::io;
use std::os::unix::io::OwnedFd;
use std::process::Stdio;

use rustix::io::Errno;
use rustix::process::{Pid, Signal, kill_process, kill_process_group};
use tokio::process::{Child as TokioChild, Command};

use super::probe::is_group_alive;
use crate::config::{PtyConfig, PtySignal};
use crate::error::{PtyError, Result, errno_to_io};
use crate::status::ExitStatus;

/// Unix child process handle.
///
/// The process ID doubles as the process group ID because the child is
/// started as a group leader.
pub struct UnixPtyChild {
    child: TokioChild,
    pid: u32,
    exit_status: Option<ExitStatus>,
}

impl std::fmt::Debug for UnixPtyChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyChild")
            .field("pid", &self.pid)
            .field("exit_status", &self.exit_status)
            .finish()
    }
}

impl UnixPtyChild {
    fn new(child: TokioChild) -> Result<Self> {
        let pid = child.id().ok_or_else(|| {
            PtyError::Spawn(io::Error::other("child exited before its pid was recorded"))
        })?;

        Ok(Self {
            child,
            pid,
            exit_status: None,
        })
    }

    /// Get the process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Get the process group ID.
    #[must_use]
    pub const fn pgid(&self) -> u32 {
        self.pid
    }

    /// Check if the process is still running.
    ///
    /// Reaps the child if it has exited.
    pub fn is_running(&mut self) -> bool {
        matches!(self.try_wait(), Ok(None))
    }

    /// Wait for the child process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }

        let status: ExitStatus = self.child.wait().await.map_err(PtyError::Wait)?.into();
        self.exit_status = Some(status);

        tracing::trace!(pid = self.pid, %status, "child reaped");
        Ok(status)
    }

    /// Try to get the exit status without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.exit_status {
            return Ok(Some(status));
        }

        let status = self.child.try_wait().map_err(PtyError::Wait)?.map(ExitStatus::from);
        self.exit_status = status;
        Ok(status)
    }

    /// Send a signal to the child process only.
    pub fn signal(&self, signal: PtySignal) -> Result<()> {
        let (pid, signal) = self.target(signal)?;
        tolerate_gone(kill_process(pid, signal))
    }

    /// Send a signal to the child's whole process group.
    ///
    /// A group that no longer exists is not an error.
    pub fn signal_group(&self, signal: PtySignal) -> Result<()> {
        let (pid, signal) = self.target(signal)?;
        tracing::trace!(pgid = self.pid, ?signal, "signalling process group");
        tolerate_gone(kill_process_group(pid, signal))
    }

    /// Kill the child's process group (SIGKILL).
    ///
    /// Once the leader has been reaped its pid may be recycled, so the group
    /// is only signalled while members are still running in it.
    pub fn kill(&mut self) -> Result<()> {
        if self.exit_status.is_some() && !is_group_alive(self.pgid()) {
            tracing::trace!(pgid = self.pid, "process group already empty");
            return Ok(());
        }
        self.signal_group(PtySignal::Kill)
    }

    fn target(&self, signal: PtySignal) -> Result<(Pid, Signal)> {
        let invalid = |what: &str| PtyError::Signal(io::Error::new(io::ErrorKind::InvalidInput, what.to_string()));

        let raw = i32::try_from(self.pid).map_err(|_| invalid("pid out of range"))?;
        let pid = Pid::from_raw(raw).ok_or_else(|| invalid("invalid pid"))?;
        let signal = Signal::from_named_raw(signal.as_unix_signal()).ok_or_else(|| invalid("invalid signal"))?;
        Ok((pid, signal))
    }
}

fn tolerate_gone(result: std::result::Result<(), Errno>) -> Result<()> {
    match result {
        Ok(()) | Err(Errno::SRCH) => Ok(()),
        Err(e) => Err(PtyError::Signal(errno_to_io(e))),
    }
}

/// Spawn a child process in a PTY.
///
/// The slave descriptor is duplicated onto the child's stdin, stdout and
/// stderr and is closed in the parent when this function returns.
pub async fn spawn_child<S, I>(slave_fd: OwnedFd, program: S, args: I, config: &PtyConfig) -> Result<UnixPtyChild>
where
    S: AsRef<OsStr>,
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let stdio = || -> Result<Stdio> { Ok(Stdio::from(slave_fd.try_clone().map_err(PtyError::Create)?)) };

    let mut cmd = Command::new(program.as_ref());
    cmd.args(args);
    cmd.env_clear();
    cmd.envs(config.effective_env());

    if let Some(ref dir) = config.working_directory {
        cmd.current_dir(dir);
    }

    cmd.stdin(stdio()?);
    cmd.stdout(stdio()?);
    cmd.stderr(stdio()?);

    if config.new_session {
        let controlling_terminal = config.controlling_terminal;
        // SAFETY: setsid and ioctl are async-signal-safe.
        unsafe {
            cmd.pre_exec(move || {
                // A session leader is also the leader of a new group
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }

                // stdin is already the slave here
                if controlling_terminal && libc::ioctl(0, libc::TIOCSCTTY, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }

                Ok(())
            });
        }
    } else {
        cmd.process_group(0);
    }

    let child = cmd.spawn().map_err(PtyError::Spawn)?;
    drop(slave_fd);

    UnixPtyChild::new(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unix::spawn;

    #[tokio::test]
    async fn exit_code_is_reported() {
        let config = PtyConfig::default();
        let (_master, mut child) = spawn("sh", ["-c", "exit 3"], &config).await.unwrap();

        let status = child.wait().await.unwrap();
        assert_eq!(status.code(), Some(3));

        // Cached after the first wait
        assert_eq!(child.try_wait().unwrap(), Some(status));
        assert!(!child.is_running());
    }

    #[tokio::test]
    async fn kill_reports_signal() {
        let config = PtyConfig::default();
        let (_master, mut child) = spawn("sleep", ["30"], &config).await.unwrap();
        assert!(child.is_running());
        assert_eq!(child.pgid(), child.pid());

        child.kill().unwrap();
        let status = child.wait().await.unwrap();
        assert_eq!(status.signal(), Some(libc::SIGKILL));
    }

    #[tokio::test]
    async fn signalling_a_reaped_group_is_ok() {
        let config = PtyConfig::default();
        let (_master, mut child) = spawn("true", std::iter::empty::<&str>(), &config).await.unwrap();
        child.wait().await.unwrap();

        assert!(child.signal_group(PtySignal::Terminate).is_ok());
        assert!(child.kill().is_ok());
    }

    #[tokio::test]
    async fn kill_after_reap_still_reaches_group_members() {
        let config = PtyConfig::default();
        let (_master, mut child) = spawn("sh", ["-c", "trap '' HUP; sleep 30 & exit 0"], &config)
            .await
            .unwrap();
        child.wait().await.unwrap();
        let pgid = child.pgid();
        assert!(is_group_alive(pgid), "background member should outlive the leader");

        child.kill().unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while is_group_alive(pgid) && std::time::Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(!is_group_alive(pgid));
    }

    #[tokio::test]
    async fn kill_after_reap_of_empty_group_is_a_no_op() {
        let config = PtyConfig::default();
        let (_master, mut child) = spawn("true", std::iter::empty::<&str>(), &config).await.unwrap();
        child.wait().await.unwrap();
        assert!(!is_group_alive(child.pgid()));

        assert!(child.kill().is_ok());
        assert_eq!(child.try_wait().unwrap().and_then(|s| s.code()), Some(0));
    }

    #[tokio::test]
    async fn process_group_without_new_session() {
        let config = PtyConfig::builder().new_session(false).build();
        let (_master, mut child) = spawn("sleep", ["30"], &config).await.unwrap();

        let pgid = rustix::process::getpgid(Pid::from_raw(child.pid() as i32)).unwrap();
        assert_eq!(pgid.as_raw_nonzero().get() as u32, child.pid());

        child.kill().unwrap();
        child.wait().await.unwrap();
    }
}

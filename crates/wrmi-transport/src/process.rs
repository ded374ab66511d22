use std::io::Read;
use std::path::PathBuf;
use std::process::Child;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Liveness capability for the peer process.
///
/// The ORB polls this before blocking on the transport so a dead compiler
/// surfaces as a typed error instead of a hung read.
pub trait ProcessHandle {
    /// Whether the process is still running.
    fn is_alive(&mut self) -> bool;

    /// Drain whatever the process wrote to stderr. Returns an empty string
    /// while the process is alive or when nothing was captured.
    fn take_stderr(&mut self) -> String;

    /// Wait up to `grace` for a clean exit, then force termination.
    fn wait_or_kill(&mut self, grace: Duration);
}

/// A spawned compiler process with pipe-path cleanup on drop.
pub struct ChildProcess {
    child: Child,
    pipe_paths: Vec<PathBuf>,
    stderr_tail: String,
}

impl ChildProcess {
    /// Default grace period between the SHUTDOWN frame and a forced kill.
    pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

    pub fn new(child: Child) -> Self {
        Self {
            child,
            pipe_paths: Vec::new(),
            stderr_tail: String::new(),
        }
    }

    /// Record pipe paths to remove when this handle is dropped.
    pub fn with_pipe_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.pipe_paths = paths;
        self
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    fn drain_stderr(&mut self) {
        if let Some(mut stderr) = self.child.stderr.take() {
            let mut text = String::new();
            if stderr.read_to_string(&mut text).is_ok() {
                self.stderr_tail.push_str(&text);
            }
        }
    }
}

impl ProcessHandle for ChildProcess {
    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn take_stderr(&mut self) -> String {
        // Only read the pipe once the child has exited; a live child's stderr
        // read would block.
        if !self.is_alive() {
            self.drain_stderr();
        }
        std::mem::take(&mut self.stderr_tail)
    }

    fn wait_or_kill(&mut self, grace: Duration) {
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(?status, "compiler exited");
                    return;
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!(pid = self.child.id(), "compiler did not exit; killing");
                        let _ = self.child.kill();
                        let _ = self.child.wait();
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(err) => {
                    warn!(%err, "failed to poll compiler exit status");
                    return;
                }
            }
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.is_alive() {
            warn!(pid = self.child.id(), "compiler still running at drop; killing");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        for path in &self.pipe_paths {
            debug!(?path, "removing pipe");
            let _ = std::fs::remove_file(path);
        }
    }
}

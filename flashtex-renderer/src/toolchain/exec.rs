//! Deadline-bounded subprocess execution.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::error::RenderError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Spawn `command` with all standard streams detached and wait for it.
///
/// On unix the child leads a new process group. If it is still running at
/// the deadline the whole group is killed, so helpers it forked (latexmk
/// runs lualatex) stop writing into the workspace too. The child is reaped
/// and [`RenderError::ToolTimeout`] is returned. The exit status is not
/// interpreted here.
pub fn run_with_timeout(
    command: &mut Command,
    tool: &str,
    timeout: Duration,
) -> Result<ExitStatus, RenderError> {
    let tool_err = |source| RenderError::Tool {
        tool: tool.to_string(),
        source,
    };

    isolate(command);
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(tool_err)?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(tool, %status, "tool exited");
                return Ok(status);
            }
            Ok(None) => {}
            Err(err) => {
                terminate(&mut child);
                return Err(tool_err(err));
            }
        }

        let now = Instant::now();
        if now >= deadline {
            terminate(&mut child);
            tracing::warn!(tool, ?timeout, "tool timed out; killed");
            return Err(RenderError::ToolTimeout {
                tool: tool.to_string(),
                timeout,
            });
        }
        sleep(POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

/// Kill the child and everything in its process group, then reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        // The child leads its own group, so its pid is the group id.
        if let Err(err) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
            tracing::debug!(error = %err, "killpg failed; killing child only");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

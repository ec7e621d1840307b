// Subprocess runner implementation
// reason: tokio for async process management and timeouts (ADR-001)
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use scriptguard_core::application::constants::{OUTPUT_DRAIN_GRACE, TERMINATION_GRACE_PERIOD};
use scriptguard_core::port::process_runner::{
    ExecutionError, ExecutionResult, ExecutionStatus, ProcessRunner, ProcessSpec,
};
use scriptguard_core::port::TimeProvider;

/// Subprocess runner
/// Spawns each guard command in its own process group so a timeout can
/// take down the interpreter together with everything it started.
pub struct SubprocessRunner {
    time_provider: Arc<dyn TimeProvider>,
    env_allowlist: Option<Vec<String>>,
}

impl SubprocessRunner {
    /// Create a runner that inherits the agent's full environment
    ///
    /// # Example
    /// ```ignore
    /// let runner = SubprocessRunner::new(Arc::new(SystemTimeProvider));
    /// ```
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            time_provider,
            env_allowlist: None,
        }
    }

    /// Only pass allowlisted variables of the agent's environment to children.
    /// Variables set explicitly on a guard are always passed.
    pub fn with_env_allowlist(mut self, env_allowlist: Vec<String>) -> Self {
        self.env_allowlist = Some(env_allowlist);
        self
    }

    /// Filter environment variables to allowlist only
    fn filter_env(&self, env: &HashMap<String, String>) -> HashMap<String, String> {
        match &self.env_allowlist {
            Some(allowlist) => env
                .iter()
                .filter(|(k, _)| allowlist.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => env.clone(),
        }
    }

    fn build_command(&self, spec: &ProcessSpec) -> Result<Command, ExecutionError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.env_allowlist.is_some() {
            let inherited: HashMap<String, String> = std::env::vars().collect();
            command.env_clear().envs(self.filter_env(&inherited));
        }
        command.envs(&spec.env);

        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        apply_identity(&mut command, spec)?;

        #[cfg(unix)]
        command.process_group(0);

        Ok(command)
    }

    /// Spawn the child and wait for it to exit.
    ///
    /// Only the interpreter's exit decides the result: output is drained on
    /// separate tasks, so a background process that inherited the pipes can
    /// neither stall the call nor turn it into a timeout.
    async fn spawn_and_wait(&self, spec: &ProcessSpec) -> Result<ChildOutcome, ExecutionError> {
        let mut command = self.build_command(spec)?;

        let mut child = command
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(format!("{}: {}", spec.program, e)))?;
        let pid = child.id();

        let stdout = child.stdout.take().map(|pipe| tokio::spawn(drain(pipe)));
        let stderr = child.stderr.take().map(|pipe| tokio::spawn(drain(pipe)));

        let status = match spec.timeout {
            Some(limit) => {
                let waited = timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => status.map_err(|e| ExecutionError::IoError(e.to_string()))?,
                    Err(_) => {
                        let timeout_ms = i64::try_from(limit.as_millis()).unwrap_or(i64::MAX);
                        warn!(
                            program = %spec.program,
                            pid = ?pid,
                            timeout_ms = %timeout_ms,
                            "Guard process exceeded its timeout, terminating"
                        );
                        self.terminate_tree(&mut child, pid).await?;
                        abort_drain(stdout);
                        abort_drain(stderr);
                        return Err(ExecutionError::Timeout(timeout_ms));
                    }
                }
            }
            None => child
                .wait()
                .await
                .map_err(|e| ExecutionError::IoError(e.to_string()))?,
        };

        Ok(ChildOutcome {
            status,
            stdout: collect_drain(stdout).await,
            stderr: collect_drain(stderr).await,
        })
    }

    /// Build execution result from the exit status and captured output
    fn build_result(&self, outcome: ChildOutcome, duration_ms: i64) -> ExecutionResult {
        let status = match outcome.status.code() {
            Some(0) => ExecutionStatus::Success,
            Some(_) => ExecutionStatus::Failed,
            None => ExecutionStatus::Killed,
        };

        ExecutionResult {
            status,
            exit_code: outcome.status.code(),
            duration_ms,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
        }
    }

    /// Terminate the process group: SIGTERM, grace period, then SIGKILL
    async fn terminate_tree(
        &self,
        child: &mut Child,
        pid: Option<u32>,
    ) -> Result<(), ExecutionError> {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let Some(pid) = pid else {
                // Already reaped
                return Ok(());
            };
            let Ok(raw) = i32::try_from(pid) else {
                return Err(ExecutionError::Killed(format!("pid {} out of range", pid)));
            };
            let pgid = Pid::from_raw(raw);

            // Step 1: SIGTERM the whole group; ESRCH means it is already gone
            match killpg(pgid, Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => return Err(ExecutionError::Killed(format!("SIGTERM failed: {}", e))),
            }

            // Step 2: Give the interpreter the grace period to exit and reap it
            if timeout(TERMINATION_GRACE_PERIOD, child.wait()).await.is_ok() {
                info!(pgid = %raw, "Guard process exited after SIGTERM");
            } else {
                warn!(pgid = %raw, "Guard process still alive, sending SIGKILL");
            }

            // Step 3: Anything left in the group is killed
            match killpg(pgid, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => return Err(ExecutionError::Killed(format!("SIGKILL failed: {}", e))),
            }
            child
                .wait()
                .await
                .map_err(|e| ExecutionError::Killed(e.to_string()))?;
            Ok(())
        }

        #[cfg(windows)]
        {
            // Windows: taskkill /T takes the child tree down with the interpreter
            use std::process::Command;

            if let Some(pid) = pid {
                info!(pid = %pid, "Killing guard process tree on Windows");
                let output = Command::new("taskkill")
                    .args(["/F", "/T", "/PID", &pid.to_string()])
                    .output()
                    .map_err(|e| ExecutionError::Killed(e.to_string()))?;

                if !output.status.success() {
                    debug!(
                        pid = %pid,
                        stderr = %String::from_utf8_lossy(&output.stderr),
                        "taskkill reported failure"
                    );
                }
            }

            child
                .kill()
                .await
                .map_err(|e| ExecutionError::Killed(e.to_string()))
        }
    }
}

/// Exit status plus whatever output was drained in time
struct ChildOutcome {
    status: ExitStatus,
    stdout: Option<String>,
    stderr: Option<String>,
}

async fn drain<R: AsyncRead + Unpin>(mut pipe: R) -> Vec<u8> {
    let mut buf = Vec::new();
    // A read error ends the capture; output is informational only
    let _ = pipe.read_to_end(&mut buf).await;
    buf
}

/// Wait briefly for a drain task; a pipe still held open elsewhere yields None
async fn collect_drain(handle: Option<JoinHandle<Vec<u8>>>) -> Option<String> {
    let mut handle = handle?;
    match timeout(OUTPUT_DRAIN_GRACE, &mut handle).await {
        Ok(Ok(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Ok(Err(_)) => None,
        Err(_) => {
            debug!("Guard output still held open after exit, not waiting for it");
            handle.abort();
            None
        }
    }
}

fn abort_drain(handle: Option<JoinHandle<Vec<u8>>>) {
    if let Some(handle) = handle {
        handle.abort();
    }
}

/// Identity the child switches to
#[cfg(unix)]
#[derive(Debug, PartialEq, Eq)]
struct ResolvedUser {
    uid: u32,
    /// Primary group from the account entry
    gid: Option<u32>,
    /// Login name, used to look up supplementary groups
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    name: Option<String>,
}

/// Switch user/group for the child (unix)
///
/// A numeric uid without an account entry has no primary group: the child
/// keeps the agent's gid unless a group is given explicitly.
#[cfg(unix)]
fn apply_identity(command: &mut Command, spec: &ProcessSpec) -> Result<(), ExecutionError> {
    let user = spec.user.as_deref().map(resolve_user).transpose()?;
    let gid = match &spec.group {
        Some(group) => Some(resolve_group(group)?),
        None => user.as_ref().and_then(|u| u.gid),
    };

    #[cfg(target_os = "linux")]
    if let Some(user) = &user {
        if let (Some(name), Some(gid)) = (&user.name, gid) {
            if nix::unistd::geteuid().is_root() {
                return switch_with_supplementary_groups(command, name, user.uid, gid);
            }
        }
    }

    if let Some(user) = &user {
        command.uid(user.uid);
    }
    if let Some(gid) = gid {
        command.gid(gid);
    }
    Ok(())
}

/// Root switching to a named account: install that account's supplementary
/// groups in the child, then drop to its gid and uid. All lookups happen in
/// the parent; the child only issues the three syscalls.
#[cfg(target_os = "linux")]
fn switch_with_supplementary_groups(
    command: &mut Command,
    name: &str,
    uid: u32,
    gid: u32,
) -> Result<(), ExecutionError> {
    use nix::unistd::{getgrouplist, setgid, setgroups, setuid, Gid, Uid};
    use std::ffi::CString;

    let login = CString::new(name)
        .map_err(|_| ExecutionError::InvalidIdentity(format!("invalid user name '{}'", name)))?;
    let groups = getgrouplist(&login, Gid::from_raw(gid)).map_err(|e| {
        ExecutionError::InvalidIdentity(format!("groups of user '{}' unavailable: {}", name, e))
    })?;

    // SAFETY: the closure only makes async-signal-safe syscalls on data
    // prepared before fork.
    unsafe {
        command.pre_exec(move || {
            setgroups(&groups)?;
            setgid(Gid::from_raw(gid))?;
            setuid(Uid::from_raw(uid))?;
            Ok(())
        });
    }
    Ok(())
}

#[cfg(windows)]
fn apply_identity(_command: &mut Command, spec: &ProcessSpec) -> Result<(), ExecutionError> {
    if spec.user.is_some() || spec.group.is_some() {
        return Err(ExecutionError::Unsupported(
            "running guards as another user or group".to_string(),
        ));
    }
    Ok(())
}

/// Name or numeric id -> account; a numeric id also picks up its entry if one exists
#[cfg(unix)]
fn resolve_user(name: &str) -> Result<ResolvedUser, ExecutionError> {
    use nix::unistd::{Uid, User};

    let from_entry = |user: User| ResolvedUser {
        uid: user.uid.as_raw(),
        gid: Some(user.gid.as_raw()),
        name: Some(user.name),
    };

    match User::from_name(name) {
        Ok(Some(user)) => Ok(from_entry(user)),
        Ok(None) => {
            let uid = name
                .parse::<u32>()
                .map_err(|_| ExecutionError::InvalidIdentity(format!("unknown user '{}'", name)))?;
            match User::from_uid(Uid::from_raw(uid)) {
                Ok(Some(user)) => Ok(from_entry(user)),
                _ => Ok(ResolvedUser {
                    uid,
                    gid: None,
                    name: None,
                }),
            }
        }
        Err(e) => Err(ExecutionError::InvalidIdentity(format!(
            "lookup of user '{}' failed: {}",
            name, e
        ))),
    }
}

#[cfg(unix)]
fn resolve_group(name: &str) -> Result<u32, ExecutionError> {
    use nix::unistd::Group;

    match Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid.as_raw()),
        Ok(None) => name
            .parse::<u32>()
            .map_err(|_| ExecutionError::InvalidIdentity(format!("unknown group '{}'", name))),
        Err(e) => Err(ExecutionError::InvalidIdentity(format!(
            "lookup of group '{}' failed: {}",
            name, e
        ))),
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(&self, spec: &ProcessSpec) -> Result<ExecutionResult, ExecutionError> {
        let start_time = self.time_provider.now_millis();

        info!(
            program = %spec.program,
            args = ?spec.args,
            cwd = ?spec.cwd,
            timeout = ?spec.timeout,
            "Starting guard subprocess"
        );

        let output = self.spawn_and_wait(spec).await?;

        let duration_ms = self.time_provider.now_millis() - start_time;
        let result = self.build_result(output, duration_ms);

        debug!(
            stdout = ?result.stdout,
            stderr = ?result.stderr,
            "Guard subprocess output"
        );
        info!(
            program = %spec.program,
            duration_ms = %duration_ms,
            exit_code = ?result.exit_code,
            status = ?result.status,
            "Guard subprocess completed"
        );

        Ok(result)
    }
}

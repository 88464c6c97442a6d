//! Supervised child lifecycle.
//!
//! Uses tokio::process for async child management. The child inherits the
//! wrapper's stdio and process group, so signals relayed to group 0 reach it
//! along with anything it spawns.

use std::process::Stdio;
use std::time::Duration;

use sigproxy_shared::config::WrapperConfig;
use sigproxy_shared::exit_status::{DecodeExitStatus, ExitOutcome, FALLBACK_EXIT_CODE};
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::{SupervisorError, SupervisorResult};
use crate::relay::{ProcessGroupForwarder, Relay, SignalForwarder, SignalInbox};

/// Whole-process lifecycle phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SignalsRegistered,
    ChildSpawning,
    ChildRunning,
    ChildTerminated,
    Delaying,
    Exited,
}

/// Builder for the supervised command.
pub struct ChildCommand {
    program: String,
    args: Vec<String>,
}

impl ChildCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Start the child without waiting for it.
    ///
    /// Stdio is bound directly to the wrapper's own streams.
    pub fn spawn(self) -> SupervisorResult<SupervisedChild> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);

        let child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        debug!(program = %self.program, pid = ?child.id(), "child started");
        Ok(SupervisedChild {
            program: self.program,
            child,
        })
    }
}

impl From<&WrapperConfig> for ChildCommand {
    fn from(config: &WrapperConfig) -> Self {
        ChildCommand::new(config.program.clone()).args(config.args.iter().cloned())
    }
}

/// A running child, owned by the lifecycle until it terminates.
pub struct SupervisedChild {
    program: String,
    child: Child,
}

impl SupervisedChild {
    /// Block until the child terminates by any means.
    pub async fn wait(mut self) -> SupervisorResult<ExitOutcome> {
        let status = self.child.wait().await.map_err(SupervisorError::Wait)?;
        let outcome = status.decode();
        debug!(program = %self.program, ?outcome, "child terminated");
        Ok(outcome)
    }
}

/// Sleep for `duration` after the child has exited.
pub async fn apply_trailing_delay(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    info!(seconds = duration.as_secs_f64(), "delaying exit");
    tokio::time::sleep(duration).await;
}

/// Supervise one child to completion and return the wrapper's exit code.
///
/// `inbox` must already be registered; the relay starts forwarding once the
/// child exists.
pub async fn run(config: &WrapperConfig, inbox: SignalInbox) -> i32 {
    run_with_forwarder(config, inbox, ProcessGroupForwarder).await
}

pub async fn run_with_forwarder<F: SignalForwarder>(
    config: &WrapperConfig,
    inbox: SignalInbox,
    forwarder: F,
) -> i32 {
    transition(Phase::SignalsRegistered);

    transition(Phase::ChildSpawning);
    let child = match ChildCommand::from(config).spawn() {
        Ok(child) => child,
        Err(e) => {
            eprintln!("sigproxy: {e}");
            transition(Phase::Exited);
            return FALLBACK_EXIT_CODE;
        }
    };

    Relay::new(inbox, forwarder).spawn();
    transition(Phase::ChildRunning);

    let outcome = match child.wait().await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("sigproxy: {e}");
            transition(Phase::Exited);
            return FALLBACK_EXIT_CODE;
        }
    };
    transition(Phase::ChildTerminated);

    let code = outcome.exit_code();

    transition(Phase::Delaying);
    apply_trailing_delay(config.after).await;

    transition(Phase::Exited);
    code
}

fn transition(phase: Phase) {
    debug!(?phase, "lifecycle");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::sync::mpsc;

    use crate::relay::TermSignal;

    struct NoopForwarder;

    impl SignalForwarder for NoopForwarder {
        fn forward(&self, _signal: TermSignal) -> SupervisorResult<()> {
            Ok(())
        }

        fn reaches_self(&self) -> bool {
            false
        }
    }

    fn config(program: &str, args: &[&str], after: Duration) -> WrapperConfig {
        WrapperConfig {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            after,
        }
    }

    fn idle_inbox() -> (mpsc::Sender<TermSignal>, SignalInbox) {
        SignalInbox::channel(1)
    }

    #[tokio::test]
    async fn test_wait_reports_exit_code() {
        let child = ChildCommand::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
        assert_eq!(child.wait().await.unwrap(), ExitOutcome::Exited(3));
    }

    #[tokio::test]
    async fn test_wait_reports_signal() {
        let child = ChildCommand::new("sh")
            .args(["-c", "kill -TERM $$"])
            .spawn()
            .unwrap();
        assert_eq!(child.wait().await.unwrap(), ExitOutcome::Signaled(15));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let err = ChildCommand::new("/nonexistent/sigproxy-missing-binary")
            .spawn()
            .err()
            .unwrap();
        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert!(err.to_string().contains("sigproxy-missing-binary"));
    }

    #[tokio::test]
    async fn test_zero_delay_is_noop() {
        let start = Instant::now();
        apply_trailing_delay(Duration::ZERO).await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_run_propagates_exit_code_after_delay() {
        let (_tx, inbox) = idle_inbox();
        let cfg = config("sh", &["-c", "exit 7"], Duration::from_millis(300));

        let start = Instant::now();
        let code = run_with_forwarder(&cfg, inbox, NoopForwarder).await;

        assert_eq!(code, 7);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_run_signaled_child() {
        let (_tx, inbox) = idle_inbox();
        let cfg = config("sh", &["-c", "kill -INT $$"], Duration::ZERO);

        assert_eq!(run_with_forwarder(&cfg, inbox, NoopForwarder).await, 130);
    }

    #[tokio::test]
    async fn test_run_spawn_failure_skips_delay() {
        let (_tx, inbox) = idle_inbox();
        let cfg = config(
            "/nonexistent/sigproxy-missing-binary",
            &[],
            Duration::from_secs(30),
        );

        let start = Instant::now();
        let code = run_with_forwarder(&cfg, inbox, NoopForwarder).await;

        assert_eq!(code, 1);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}

//! Helpers for driving the built `sigproxy` binary.

#![allow(dead_code)]

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use sigproxy_shared::config::AFTER_SECONDS_ENV;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout};

/// Time given to the wrapper to install handlers and start its child.
pub const STARTUP_GRACE: Duration = Duration::from_millis(500);

/// Wrapper command in its own process group.
///
/// Forwarding targets group 0, so sharing the harness's group would signal
/// the test runner too.
pub fn sigproxy<I, S>(args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sigproxy"));
    cmd.args(args)
        .process_group(0)
        .env_remove(AFTER_SECONDS_ENV)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .kill_on_drop(true);
    cmd
}

/// Wait for the wrapper, failing the test if it outlives `limit`.
pub async fn wait_within(child: &mut Child, limit: Duration) -> ExitStatus {
    timeout(limit, child.wait())
        .await
        .expect("sigproxy did not exit in time")
        .expect("failed to wait for sigproxy")
}

/// Run to completion and return the status with the elapsed time.
pub async fn run_timed(mut cmd: Command) -> (ExitStatus, Duration) {
    let start = Instant::now();
    let mut child = cmd.spawn().expect("failed to start sigproxy");
    let status = wait_within(&mut child, Duration::from_secs(20)).await;
    (status, start.elapsed())
}

/// Send `signal` to the wrapper process only.
pub fn signal_wrapper(child: &Child, signal: Signal) {
    let pid = child.id().expect("sigproxy already reaped");
    kill(Pid::from_raw(pid as i32), signal).expect("failed to signal sigproxy");
}

/// Start the wrapper, give it time to spawn its child, then signal it.
pub async fn start_then_signal(mut cmd: Command, signal: Signal) -> (Child, Instant) {
    let child = cmd.spawn().expect("failed to start sigproxy");
    sleep(STARTUP_GRACE).await;
    let sent_at = Instant::now();
    signal_wrapper(&child, signal);
    (child, sent_at)
}

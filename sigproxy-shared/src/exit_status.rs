//! Platform decoding of a child's raw termination status.
//!
//! This is the only OS-coupled piece of the lifecycle: everything else works
//! with [`ExitOutcome`], which maps onto the wrapper's own exit code.

use std::process::ExitStatus;

/// Exit code used when a termination cannot be classified.
pub const FALLBACK_EXIT_CODE: i32 = 1;

/// Offset added to a signal number, following the shell convention.
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with the given code.
    Exited(i32),
    /// Killed by the given signal number.
    Signaled(i32),
    /// Neither an exit code nor a signal could be recovered.
    Unknown,
}

impl ExitOutcome {
    /// Exit code the wrapper should terminate with.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitOutcome::Exited(code) => *code,
            ExitOutcome::Signaled(signo) => SIGNAL_EXIT_BASE + signo,
            ExitOutcome::Unknown => FALLBACK_EXIT_CODE,
        }
    }

    pub fn was_signaled(&self) -> bool {
        matches!(self, ExitOutcome::Signaled(_))
    }
}

/// Capability to turn a platform exit status into an [`ExitOutcome`].
pub trait DecodeExitStatus {
    fn decode(&self) -> ExitOutcome;
}

#[cfg(unix)]
impl DecodeExitStatus for ExitStatus {
    fn decode(&self) -> ExitOutcome {
        use std::os::unix::process::ExitStatusExt;

        if let Some(code) = self.code() {
            ExitOutcome::Exited(code)
        } else if let Some(signo) = self.signal() {
            ExitOutcome::Signaled(signo)
        } else {
            ExitOutcome::Unknown
        }
    }
}

#[cfg(not(unix))]
impl DecodeExitStatus for ExitStatus {
    fn decode(&self) -> ExitOutcome {
        match self.code() {
            Some(code) => ExitOutcome::Exited(code),
            None => ExitOutcome::Unknown,
        }
    }
}

/// Decode `status` into `(exit_code, was_signaled)`.
pub fn decode_exit_status<S: DecodeExitStatus>(status: &S) -> (i32, bool) {
    let outcome = status.decode();
    (outcome.exit_code(), outcome.was_signaled())
}

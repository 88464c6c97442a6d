use std::io;

/// Fatal, non-retried failures of a single supervised invocation.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to register signal handlers: {0}")]
    SignalRegistration(#[source] io::Error),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for child: {0}")]
    Wait(#[source] io::Error),

    #[error("failed to forward {signal}: {source}")]
    Forward {
        signal: &'static str,
        #[source]
        source: nix::Error,
    },
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;

use std::time::Duration;

/// Environment variable consulted when `--after` is not given.
pub const AFTER_SECONDS_ENV: &str = "SIGPROXY_AFTER_SECONDS";

/// Immutable wrapper configuration, resolved once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperConfig {
    pub program: String,
    pub args: Vec<String>,
    pub after: Duration,
}

impl WrapperConfig {
    /// Build a config from the positional command vector.
    ///
    /// Returns `None` when no command was given.
    pub fn from_command(command: Vec<String>, after_secs: u64) -> Option<Self> {
        let mut command = command.into_iter();
        let program = command.next()?;
        Some(Self {
            program,
            args: command.collect(),
            after: Duration::from_secs(after_secs),
        })
    }
}

use std::ffi::OsString;

use clap::Parser;
use clap::error::ErrorKind;
use sigproxy_shared::config::{AFTER_SECONDS_ENV, WrapperConfig};

use crate::relay::{DEFAULT_INBOX_CAPACITY, SignalInbox};
use crate::supervisor;
use crate::util::logging;

#[derive(Parser, Debug)]
#[command(name = "sigproxy")]
#[command(
    version,
    about = "Wrapper command to proxy signals to a command's process group and sleep after it exits",
    override_usage = "sigproxy [options] -- <command> [arguments ...]"
)]
struct Cli {
    /// Sleep this many seconds after the command exits
    #[arg(long, value_name = "SECONDS", env = AFTER_SECONDS_ENV, default_value_t = 0)]
    after: u64,

    /// Command to run, followed by its arguments
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

/// Outcome of argument parsing.
#[derive(Debug)]
pub enum Invocation {
    Run(WrapperConfig),
    /// Help or version was printed; exit with the given code.
    Exit(i32),
}

/// Rewrite single-dash long flags (`-after=N`, `-after N`).
///
/// Stops at `--` or the first positional so child arguments stay untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    let mut expect_value = false;

    for arg in args.by_ref() {
        if expect_value {
            expect_value = false;
            normalized.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            break;
        };

        if text == "--" || !text.starts_with('-') {
            normalized.push(arg);
            break;
        }

        if text == "-after" || text == "--after" {
            normalized.push("--after".into());
            expect_value = true;
        } else if let Some(value) = text.strip_prefix("-after=") {
            normalized.push(format!("--after={value}").into());
        } else {
            normalized.push(arg);
        }
    }

    normalized.extend(args);
    normalized
}

/// Parse the wrapper's arguments into a config.
///
/// Usage errors are rendered to stderr and reported as exit code 1.
pub fn parse_from<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    match Cli::try_parse_from(normalize_args(args)) {
        Ok(cli) => match WrapperConfig::from_command(cli.command, cli.after) {
            Some(config) => Invocation::Run(config),
            None => {
                eprintln!("{}", usage_error("missing command"));
                Invocation::Exit(1)
            }
        },
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                Invocation::Exit(0)
            }
            _ => {
                eprint!("{}", e.render());
                Invocation::Exit(1)
            }
        },
    }
}

fn usage_error(message: &str) -> String {
    use clap::CommandFactory;

    let mut cmd = Cli::command();
    cmd.error(ErrorKind::MissingRequiredArgument, message)
        .render()
        .to_string()
}

/// Full wrapper run: register signals, parse, supervise.
///
/// Returns the exit code the wrapper should terminate with.
pub async fn cli() -> anyhow::Result<i32> {
    // Handlers go in before anything else so no early signal is lost.
    let inbox = SignalInbox::register(DEFAULT_INBOX_CAPACITY)?;

    logging::init_tracing();

    let config = match parse_from(std::env::args_os()) {
        Invocation::Run(config) => config,
        Invocation::Exit(code) => return Ok(code),
    };

    tracing::debug!(?config, "configuration resolved");
    Ok(supervisor::run(&config, inbox).await)
}

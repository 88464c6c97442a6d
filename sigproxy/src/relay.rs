//! Termination-signal relay.
//!
//! Signals are caught into a bounded FIFO inbox as soon as the wrapper
//! starts, and a relay task re-delivers each one to the wrapper's process
//! group once the child is running. Signals that arrive while the child is
//! still being spawned wait in the inbox instead of being lost.
//!
//! Handlers stay installed for the whole life of the process, so the
//! wrapper itself never takes the default "terminate" action for SIGINT or
//! SIGTERM. A forward to process group 0 comes back to the wrapper as well;
//! the relay drops those echoes rather than forwarding them again. When a
//! genuine signal lands together with an echo of the same kind, the OS merges
//! them into one delivery and that genuine signal is dropped too.

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{SupervisorError, SupervisorResult};

/// Default number of signals buffered before the relay drains them.
pub const DEFAULT_INBOX_CAPACITY: usize = 8;

/// Signals the wrapper proxies to its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermSignal {
    Interrupt,
    Terminate,
}

impl TermSignal {
    pub const ALL: [TermSignal; 2] = [TermSignal::Interrupt, TermSignal::Terminate];

    pub fn as_signal(self) -> Signal {
        match self {
            TermSignal::Interrupt => Signal::SIGINT,
            TermSignal::Terminate => Signal::SIGTERM,
        }
    }

    pub fn kind(self) -> SignalKind {
        match self {
            TermSignal::Interrupt => SignalKind::interrupt(),
            TermSignal::Terminate => SignalKind::terminate(),
        }
    }

    pub fn name(self) -> &'static str {
        self.as_signal().as_str()
    }

    fn index(self) -> usize {
        match self {
            TermSignal::Interrupt => 0,
            TermSignal::Terminate => 1,
        }
    }
}

/// Bounded queue of received termination signals.
pub struct SignalInbox {
    rx: mpsc::Receiver<TermSignal>,
}

impl SignalInbox {
    /// Install OS handlers for SIGINT and SIGTERM and start feeding the inbox.
    ///
    /// Must be called from within a tokio runtime, before the child is
    /// spawned. Handlers are installed before this returns.
    pub fn register(capacity: usize) -> SupervisorResult<Self> {
        let mut streams = Vec::with_capacity(TermSignal::ALL.len());
        for sig in TermSignal::ALL {
            let stream = signal(sig.kind()).map_err(SupervisorError::SignalRegistration)?;
            streams.push((sig, stream));
        }

        let (tx, inbox) = Self::channel(capacity);
        for (sig, mut stream) in streams {
            let tx = tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    trace!(signal = sig.name(), "signal received");
                    if tx.send(sig).await.is_err() {
                        break;
                    }
                }
            });
        }

        debug!(capacity, "signal handlers registered");
        Ok(inbox)
    }

    /// Inbox fed by the returned sender instead of OS handlers.
    pub fn channel(capacity: usize) -> (mpsc::Sender<TermSignal>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }

    pub async fn recv(&mut self) -> Option<TermSignal> {
        self.rx.recv().await
    }
}

/// Delivery target for relayed signals.
pub trait SignalForwarder: Send + 'static {
    fn forward(&self, signal: TermSignal) -> SupervisorResult<()>;

    /// Whether a forwarded signal is also delivered back to this process.
    fn reaches_self(&self) -> bool;
}

/// Sends signals to the wrapper's own process group (`kill(0, sig)`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGroupForwarder;

impl SignalForwarder for ProcessGroupForwarder {
    fn forward(&self, signal: TermSignal) -> SupervisorResult<()> {
        kill(Pid::from_raw(0), signal.as_signal()).map_err(|source| SupervisorError::Forward {
            signal: signal.name(),
            source,
        })
    }

    fn reaches_self(&self) -> bool {
        true
    }
}

/// Outstanding self-deliveries, per signal kind.
#[derive(Debug, Default)]
struct EchoLedger {
    pending: [u32; 2],
}

impl EchoLedger {
    fn expect(&mut self, signal: TermSignal) {
        self.pending[signal.index()] += 1;
    }

    /// Consume one expected echo; false if none was outstanding.
    fn take(&mut self, signal: TermSignal) -> bool {
        let slot = &mut self.pending[signal.index()];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }
}

pub struct Relay<F> {
    inbox: SignalInbox,
    forwarder: F,
    echoes: EchoLedger,
}

impl<F: SignalForwarder> Relay<F> {
    pub fn new(inbox: SignalInbox, forwarder: F) -> Self {
        Self {
            inbox,
            forwarder,
            echoes: EchoLedger::default(),
        }
    }

    /// Run the relay on its own task. It is never joined in production;
    /// process exit tears it down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drain the inbox until it closes.
    pub async fn run(mut self) {
        while let Some(signal) = self.inbox.recv().await {
            self.relay(signal);
        }
        debug!("signal inbox closed, relay stopped");
    }

    fn relay(&mut self, signal: TermSignal) {
        if self.echoes.take(signal) {
            trace!(signal = signal.name(), "dropping self-delivered signal");
            return;
        }

        match self.forwarder.forward(signal) {
            Ok(()) => {
                debug!(signal = signal.name(), "forwarded signal to process group");
                if self.forwarder.reaches_self() {
                    self.echoes.expect(signal);
                }
            }
            Err(e) => warn!(error = %e, "signal forwarding failed"),
        }
    }
}

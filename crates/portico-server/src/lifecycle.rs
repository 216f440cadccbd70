//! Server lifecycle state machine.
//!
//! One machine per server instance:
//!
//! ```text
//! Configured -> Composing -> Running -> ShuttingDown -> Stopped
//!                   |            |
//!                   +-> Failed <-+
//! ```
//!
//! `Stopped` and `Failed` are terminal. Transitions are published through a
//! watch channel so embedding code and tests can observe progress without
//! holding the server itself.

use tokio::sync::watch;

/// The states a server instance moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Configuration merged; routes and middleware may still be registered.
    Configured,

    /// The middleware chain is being composed around the dispatcher.
    Composing,

    /// The transport is accepting connections.
    Running,

    /// Draining in-flight requests after an interrupt.
    ShuttingDown,

    /// Shutdown finished; attempted exactly once, never re-entered.
    Stopped,

    /// Composition or the transport failed.
    Failed,
}

impl LifecycleState {
    /// Returns `true` if `next` is a legal successor of this state.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Configured, Self::Composing)
                | (Self::Composing, Self::Running | Self::Failed)
                | (Self::Running, Self::ShuttingDown | Self::Failed)
                | (Self::ShuttingDown, Self::Stopped)
        )
    }

    /// Returns `true` for `Stopped` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configured => "configured",
            Self::Composing => "composing",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Publisher side of the lifecycle machine.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    tx: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    /// Creates a machine in the `Configured` state.
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Configured);
        Self { tx }
    }

    /// Returns the current state.
    pub(crate) fn state(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Returns an observer for state transitions.
    pub(crate) fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Moves to `next`, logging the checkpoint.
    ///
    /// Illegal transitions are logged and ignored; they indicate a bug in
    /// the controller, not in the embedding application.
    pub(crate) fn advance(&self, next: LifecycleState) {
        let current = self.state();
        if current.can_transition_to(next) {
            tracing::info!(from = %current, to = %next, "lifecycle transition");
            self.tx.send_replace(next);
        } else {
            tracing::warn!(from = %current, to = %next, "ignoring illegal lifecycle transition");
        }
    }
}

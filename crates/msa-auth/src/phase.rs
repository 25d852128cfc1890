use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Pipeline stage currently in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    AwaitingLogin,
    AcquiringMicrosoftAccount,
    RefreshingMicrosoftAccount,
    AcquiringXblToken,
    AcquiringXstsToken,
    AcquiringMinecraftAccount,
    AcquiringMinecraftEntitlements,
    AcquiringMinecraftProfile,
}

impl Phase {
    pub fn message(self) -> &'static str {
        match self {
            Self::AwaitingLogin => "Display Login Page",
            Self::AcquiringMicrosoftAccount => "Acquire Microsoft Account",
            Self::RefreshingMicrosoftAccount => "Refresh Microsoft Account",
            Self::AcquiringXblToken => "Acquire XBL Account",
            Self::AcquiringXstsToken => "Acquire XSTS Account",
            Self::AcquiringMinecraftAccount => "Acquire Minecraft Account",
            Self::AcquiringMinecraftEntitlements => "Acquire Minecraft Store",
            Self::AcquiringMinecraftProfile => "Acquire Minecraft Profile",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Progress cursor of the current pipeline run.
///
/// Overwritten on every stage transition and cleared when a run starts.
/// Observers either poll [`PhaseTracker::current`] or wait on a receiver
/// from [`PhaseTracker::subscribe`]. It is diagnostic only; nothing in the
/// pipeline reads it back to make decisions.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    sender: Arc<watch::Sender<Option<Phase>>>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Option<Phase> {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Phase>> {
        self.sender.subscribe()
    }

    pub(crate) fn advance(&self, phase: Phase) {
        debug!(phase = %phase, "Entering phase");
        self.sender.send_replace(Some(phase));
    }

    pub(crate) fn reset(&self) {
        self.sender.send_replace(None);
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

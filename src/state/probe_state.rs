/// Probe state definitions for tracking link checks
///
/// Every unique link discovered on a page walks `Queued → Probed` and then
/// settles in exactly one terminal state.
use std::fmt;

/// Represents the current state of a link in the checking process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeState {
    // ===== Active States =====
    /// Link is waiting in the probe queue
    Queued,

    /// A probe request has been issued for the link
    Probed,

    // ===== Terminal States =====
    /// Probe answered with a 2xx or 3xx status
    Accessible,

    /// Probe answered with any other status, failed or timed out
    Inaccessible,

    /// Link was never probed (admission refused or checking disabled)
    Skipped,
}

impl ProbeState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Probed)
    }

    /// Checks whether moving to `next` is a legal transition
    ///
    /// Skipped is reachable from Queued only: a link that was probed always
    /// has a definite answer.
    pub fn can_transition_to(&self, next: ProbeState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Probed)
                | (Self::Queued, Self::Skipped)
                | (Self::Probed, Self::Accessible)
                | (Self::Probed, Self::Inaccessible)
        )
    }

    /// Terminal state for an HTTP status returned by a probe
    pub fn from_status(status: u16) -> Self {
        if (200..400).contains(&status) {
            Self::Accessible
        } else {
            Self::Inaccessible
        }
    }
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Probed => "probed",
            Self::Accessible => "accessible",
            Self::Inaccessible => "inaccessible",
            Self::Skipped => "skipped",
        };
        write!(f, "{}", name)
    }
}

/// Final result of checking one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Accessible { status: u16 },
    Inaccessible { reason: String },
    Skipped { reason: String },
}

impl ProbeOutcome {
    /// The terminal state this outcome corresponds to
    pub fn state(&self) -> ProbeState {
        match self {
            Self::Accessible { .. } => ProbeState::Accessible,
            Self::Inaccessible { .. } => ProbeState::Inaccessible,
            Self::Skipped { .. } => ProbeState::Skipped,
        }
    }
}

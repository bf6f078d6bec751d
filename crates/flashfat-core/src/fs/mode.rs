//! Session mode state machine

use super::read::ReadSession;
use super::write::WriteSession;

/// Current mode of the store
///
/// Each state carries only the session state meaningful to it.
pub(crate) enum Mode {
    /// No file open
    Idle,
    /// A new file is being written
    Writing(WriteSession),
    /// A stored file is being read
    Reading(ReadSession),
}

impl Mode {
    pub(crate) fn kind(&self) -> ModeKind {
        match self {
            Self::Idle => ModeKind::Idle,
            Self::Writing(_) => ModeKind::Writing,
            Self::Reading(_) => ModeKind::Reading,
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Public view of the store mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// No file open
    Idle,
    /// Writing a new file
    Writing,
    /// Reading a stored file
    Reading,
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    PowerSaver,
    UltraSaver,
    Restored,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerSaver => "PowerSaver",
            Self::UltraSaver => "UltraSaver",
            Self::Restored => "Restored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "PowerSaver" => Some(Self::PowerSaver),
            "UltraSaver" => Some(Self::UltraSaver),
            "Restored" => Some(Self::Restored),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a permitted mode change is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Fresh optimization pass starting from the restored state.
    Enter,
    /// Re-apply of the mode that is already active.
    Reapply,
    /// Back to the pre-optimization state.
    Restore,
    /// Already restored, nothing to do.
    NoOp,
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("cannot switch from {from} to {to} directly; restore the previous state first")]
    IllegalTransition { from: Mode, to: Mode },
    #[error("another ecomode operation is already in progress")]
    ConcurrentOperationInProgress,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Validates a requested mode change against the currently persisted mode.
///
/// Swapping one optimization profile for another without an intervening
/// restore is rejected, so two profiles can never leave overlapping partial
/// mutations behind.
pub fn check_transition(current: Mode, requested: Mode) -> Result<Transition, OperationError> {
    use Mode::*;

    match (current, requested) {
        (Restored, Restored) => Ok(Transition::NoOp),
        (Restored, _) => Ok(Transition::Enter),
        (a, b) if a == b => Ok(Transition::Reapply),
        (_, Restored) => Ok(Transition::Restore),
        (from, to) => Err(OperationError::IllegalTransition { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimization_from_restored() {
        assert_eq!(
            check_transition(Mode::Restored, Mode::PowerSaver).unwrap(),
            Transition::Enter
        );
        assert_eq!(
            check_transition(Mode::Restored, Mode::UltraSaver).unwrap(),
            Transition::Enter
        );
    }

    #[test]
    fn test_reapply_is_permitted() {
        assert_eq!(
            check_transition(Mode::PowerSaver, Mode::PowerSaver).unwrap(),
            Transition::Reapply
        );
        assert_eq!(
            check_transition(Mode::UltraSaver, Mode::UltraSaver).unwrap(),
            Transition::Reapply
        );
    }

    #[test]
    fn test_profile_swap_is_rejected() {
        for (from, to) in [
            (Mode::PowerSaver, Mode::UltraSaver),
            (Mode::UltraSaver, Mode::PowerSaver),
        ] {
            match check_transition(from, to) {
                Err(OperationError::IllegalTransition { from: f, to: t }) => {
                    assert_eq!(f, from);
                    assert_eq!(t, to);
                }
                other => panic!("expected IllegalTransition for {from} -> {to}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_restore_from_either_profile() {
        assert_eq!(
            check_transition(Mode::PowerSaver, Mode::Restored).unwrap(),
            Transition::Restore
        );
        assert_eq!(
            check_transition(Mode::UltraSaver, Mode::Restored).unwrap(),
            Transition::Restore
        );
    }

    #[test]
    fn test_restored_to_restored_is_noop() {
        assert_eq!(
            check_transition(Mode::Restored, Mode::Restored).unwrap(),
            Transition::NoOp
        );
    }

    #[test]
    fn test_mode_token_round_trip() {
        for mode in [Mode::PowerSaver, Mode::UltraSaver, Mode::Restored] {
            assert_eq!(Mode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(Mode::parse("Balanced"), None);
        assert_eq!(Mode::parse("  UltraSaver\n"), Some(Mode::UltraSaver));
    }
}

use std::fmt;

/// Position of a trial in the grasping sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrialState {
    #[default]
    Idle,
    GogglesOpaqueWait,
    CueDelivery,
    GogglesTransparentWait,
    LiftWait,
    ReturnWait,
    GogglesOpaqueFinal,
    Complete,
    /// Reached from any non-terminal state when the session is ended early.
    Aborted,
}

impl TrialState {
    /// Next state on success; `None` for terminal states.
    pub fn next(&self) -> Option<Self> {
        use TrialState::*;
        Some(match self {
            Idle => GogglesOpaqueWait,
            GogglesOpaqueWait => CueDelivery,
            CueDelivery => GogglesTransparentWait,
            GogglesTransparentWait => LiftWait,
            LiftWait => ReturnWait,
            ReturnWait => GogglesOpaqueFinal,
            GogglesOpaqueFinal => Complete,
            Complete | Aborted => return None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TrialState::Complete | TrialState::Aborted)
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrialState::Idle => "idle",
            TrialState::GogglesOpaqueWait => "goggles-opaque-wait",
            TrialState::CueDelivery => "cue-delivery",
            TrialState::GogglesTransparentWait => "goggles-transparent-wait",
            TrialState::LiftWait => "lift-wait",
            TrialState::ReturnWait => "return-wait",
            TrialState::GogglesOpaqueFinal => "goggles-opaque-final",
            TrialState::Complete => "complete",
            TrialState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// How a trial that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    Completed,
    /// The end-experiment interrupt arrived while in state `at`.
    Aborted { at: TrialState },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_advance_in_trial_order() {
        let mut state = TrialState::Idle;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            visited.push(next);
            state = next;
        }
        assert_eq!(
            visited,
            vec![
                TrialState::Idle,
                TrialState::GogglesOpaqueWait,
                TrialState::CueDelivery,
                TrialState::GogglesTransparentWait,
                TrialState::LiftWait,
                TrialState::ReturnWait,
                TrialState::GogglesOpaqueFinal,
                TrialState::Complete,
            ]
        );
    }

    #[test]
    fn aborted_is_terminal() {
        assert!(TrialState::Aborted.is_terminal());
        assert_eq!(TrialState::Aborted.next(), None);
        assert!(!TrialState::LiftWait.is_terminal());
    }
}

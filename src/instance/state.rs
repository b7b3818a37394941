use std::time::Duration;

use tokio::sync::watch;

use crate::error::{OverseerError, Result};

/// Lifecycle state of one overseer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    New,
    Starting,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceState::New => write!(f, "new"),
            InstanceState::Starting => write!(f, "starting"),
            InstanceState::Running => write!(f, "running"),
            InstanceState::Stopping => write!(f, "stopping"),
            InstanceState::Terminated => write!(f, "terminated"),
            InstanceState::Failed => write!(f, "failed"),
        }
    }
}

impl InstanceState {
    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, InstanceState::Terminated | InstanceState::Failed)
    }

    /// The set of states reachable from `self`. `Failed` is reachable from
    /// every non-terminal state.
    pub fn valid_transitions(self) -> &'static [InstanceState] {
        match self {
            InstanceState::New => &[InstanceState::Starting, InstanceState::Failed],
            InstanceState::Starting => &[
                InstanceState::Running,
                InstanceState::Stopping,
                InstanceState::Failed,
            ],
            InstanceState::Running => &[InstanceState::Stopping, InstanceState::Failed],
            InstanceState::Stopping => &[InstanceState::Terminated, InstanceState::Failed],
            InstanceState::Terminated | InstanceState::Failed => &[],
        }
    }

    pub fn can_transition(self, to: InstanceState) -> bool {
        self.valid_transitions().contains(&to)
    }
}

/// Shared, watchable holder of the instance lifecycle state.
pub(crate) struct StateCell {
    tx: watch::Sender<InstanceState>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(InstanceState::New);
        Self { tx }
    }

    pub fn current(&self) -> InstanceState {
        *self.tx.borrow()
    }

    /// Guarded transition; invalid transitions are usage errors.
    pub fn transition(&self, to: InstanceState) -> Result<()> {
        let mut from = InstanceState::New;
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            from = *state;
            if state.can_transition(to) {
                *state = to;
                applied = true;
                true
            } else {
                false
            }
        });
        if applied {
            tracing::debug!(%from, %to, "Instance state transition");
            Ok(())
        } else {
            Err(OverseerError::InvalidState(format!(
                "cannot transition instance from {from} to {to}"
            )))
        }
    }

    /// Absorbing failure transition; a no-op once terminal.
    pub fn fail(&self) {
        self.tx.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = InstanceState::Failed;
                true
            }
        });
    }

    /// Bounded wait until `target` is reached.
    ///
    /// Fails with a timeout error when the deadline elapses, and with an
    /// invalid-state error when a different terminal state is reached first
    /// (the target can then never be reached).
    pub async fn await_state(
        &self,
        target: InstanceState,
        timeout: Duration,
        what: &str,
    ) -> Result<()> {
        let mut rx = self.tx.subscribe();
        let wait = async {
            loop {
                let state = *rx.borrow_and_update();
                if state == target {
                    return Ok(());
                }
                if state.is_terminal() {
                    return Err(OverseerError::InvalidState(format!(
                        "instance reached {state} while waiting for {target}"
                    )));
                }
                if rx.changed().await.is_err() {
                    return Err(OverseerError::Internal(
                        "instance state channel closed".to_string(),
                    ));
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(OverseerError::timeout(timeout, what)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_to_starting() {
        assert!(InstanceState::New.can_transition(InstanceState::Starting));
    }

    #[test]
    fn starting_to_running() {
        assert!(InstanceState::Starting.can_transition(InstanceState::Running));
    }

    #[test]
    fn running_to_stopping() {
        assert!(InstanceState::Running.can_transition(InstanceState::Stopping));
    }

    #[test]
    fn stopping_to_terminated() {
        assert!(InstanceState::Stopping.can_transition(InstanceState::Terminated));
    }

    #[test]
    fn failed_reachable_from_non_terminal() {
        for state in [
            InstanceState::New,
            InstanceState::Starting,
            InstanceState::Running,
            InstanceState::Stopping,
        ] {
            assert!(state.can_transition(InstanceState::Failed));
        }
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(InstanceState::Terminated.valid_transitions().is_empty());
        assert!(InstanceState::Failed.valid_transitions().is_empty());
    }

    #[test]
    fn new_to_running_invalid() {
        assert!(!InstanceState::New.can_transition(InstanceState::Running));
    }

    #[test]
    fn running_to_terminated_invalid() {
        assert!(!InstanceState::Running.can_transition(InstanceState::Terminated));
    }

    #[test]
    fn cell_rejects_invalid_transition() {
        let cell = StateCell::new();
        assert!(cell.transition(InstanceState::Running).is_err());
        assert_eq!(cell.current(), InstanceState::New);
    }

    #[test]
    fn cell_applies_valid_chain() {
        let cell = StateCell::new();
        cell.transition(InstanceState::Starting).unwrap();
        cell.transition(InstanceState::Running).unwrap();
        cell.transition(InstanceState::Stopping).unwrap();
        cell.transition(InstanceState::Terminated).unwrap();
        assert_eq!(cell.current(), InstanceState::Terminated);
    }

    #[test]
    fn fail_is_absorbing() {
        let cell = StateCell::new();
        cell.transition(InstanceState::Starting).unwrap();
        cell.fail();
        assert_eq!(cell.current(), InstanceState::Failed);
        // Already terminal: fail() stays put and transitions keep failing.
        cell.fail();
        assert_eq!(cell.current(), InstanceState::Failed);
        assert!(cell.transition(InstanceState::Stopping).is_err());
    }

    #[tokio::test]
    async fn await_state_times_out() {
        let cell = StateCell::new();
        let err = cell
            .await_state(
                InstanceState::Running,
                Duration::from_millis(20),
                "instance running",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OverseerError::Timeout { .. }));
    }

    #[tokio::test]
    async fn await_state_sees_current_state() {
        let cell = StateCell::new();
        cell.transition(InstanceState::Starting).unwrap();
        cell.transition(InstanceState::Running).unwrap();
        cell.await_state(
            InstanceState::Running,
            Duration::from_millis(20),
            "instance running",
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn await_state_fails_on_wrong_terminal() {
        let cell = StateCell::new();
        cell.fail();
        let err = cell
            .await_state(
                InstanceState::Running,
                Duration::from_millis(20),
                "instance running",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OverseerError::InvalidState(_)));
    }
}

use serde::Serialize;
use statig::prelude::*;

/// Phases a provisioning session moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningPhase {
    Start,
    ExistenceChecked,
    RemoteCreated,
    Cloned,
    BranchResolved,
    Published,
    Tagged,
    Succeeded,
    Aborted,
    RollingBack,
    RolledBack,
    RollbackFailed,
}

impl ProvisioningPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProvisioningPhase::Succeeded
                | ProvisioningPhase::Aborted
                | ProvisioningPhase::RolledBack
                | ProvisioningPhase::RollbackFailed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ExistenceChecked,
    RemoteCreated,
    Cloned,
    BranchResolved { branch: String },
    Published,
    Tagged,
    Complete,
    Fail { kind: &'static str, message: String },
    /// Creation was requested but never confirmed; cleanup follows.
    CreationUnconfirmed { kind: &'static str, message: String },
    RollbackFinished { succeeded: bool },
}

/// Session bookkeeping driven by [`SessionEvent`]s.
///
/// Failures before the remote exists abort; failures after it move to
/// `rolling_back`, and only `RollbackFinished` leaves that state.
#[derive(Debug)]
pub struct SessionLifecycle {
    pub correlation_id: String,
    phase: ProvisioningPhase,
    branch: Option<String>,
    errors: Vec<String>,
}

impl SessionLifecycle {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            phase: ProvisioningPhase::Start,
            branch: None,
            errors: Vec::new(),
        }
    }

    fn advance(&mut self, phase: ProvisioningPhase) {
        tracing::debug!(
            correlation.id = %self.correlation_id,
            from = ?self.phase,
            to = ?phase,
            "Session phase changed"
        );
        self.phase = phase;
    }

    fn record_failure(&mut self, kind: &str, message: &str) {
        tracing::debug!(correlation.id = %self.correlation_id, error.kind = kind, "Recording failure");
        self.errors.push(format!("{kind}: {message}"));
    }
}

#[state_machine(initial = "State::start()")]
impl SessionLifecycle {
    #[state]
    fn start(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::ExistenceChecked => {
                self.advance(ProvisioningPhase::ExistenceChecked);
                Transition(State::existence_checked())
            }
            SessionEvent::Fail { kind, message } => {
                self.record_failure(kind, message);
                self.advance(ProvisioningPhase::Aborted);
                Transition(State::aborted())
            }
            _ => Handled,
        }
    }

    #[state]
    fn existence_checked(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::RemoteCreated => {
                self.advance(ProvisioningPhase::RemoteCreated);
                Transition(State::remote_created())
            }
            SessionEvent::Fail { kind, message } => {
                self.record_failure(kind, message);
                self.advance(ProvisioningPhase::Aborted);
                Transition(State::aborted())
            }
            SessionEvent::CreationUnconfirmed { kind, message } => {
                self.begin_rollback(kind, message)
            }
            _ => Handled,
        }
    }

    #[state]
    fn remote_created(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Cloned => {
                self.advance(ProvisioningPhase::Cloned);
                Transition(State::cloned())
            }
            SessionEvent::Fail { kind, message } => self.begin_rollback(kind, message),
            _ => Handled,
        }
    }

    #[state]
    fn cloned(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::BranchResolved { branch } => {
                self.branch = Some(branch.clone());
                self.advance(ProvisioningPhase::BranchResolved);
                Transition(State::branch_resolved())
            }
            SessionEvent::Fail { kind, message } => self.begin_rollback(kind, message),
            _ => Handled,
        }
    }

    #[state]
    fn branch_resolved(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Published => {
                self.advance(ProvisioningPhase::Published);
                Transition(State::published())
            }
            SessionEvent::Fail { kind, message } => self.begin_rollback(kind, message),
            _ => Handled,
        }
    }

    #[state]
    fn published(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Tagged => {
                self.advance(ProvisioningPhase::Tagged);
                Transition(State::tagged())
            }
            SessionEvent::Fail { kind, message } => self.begin_rollback(kind, message),
            _ => Handled,
        }
    }

    /// Post-tag failures are warnings; the session can only complete from here.
    #[state]
    fn tagged(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Complete => {
                self.advance(ProvisioningPhase::Succeeded);
                Transition(State::succeeded())
            }
            _ => Handled,
        }
    }

    #[state]
    fn rolling_back(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::RollbackFinished { succeeded: true } => {
                self.advance(ProvisioningPhase::RolledBack);
                Transition(State::rolled_back())
            }
            SessionEvent::RollbackFinished { succeeded: false } => {
                self.advance(ProvisioningPhase::RollbackFailed);
                Transition(State::orphaned())
            }
            _ => Handled,
        }
    }

    #[state]
    fn succeeded(event: &SessionEvent) -> Outcome<State> {
        let _ = event;
        Handled
    }

    #[state]
    fn aborted(event: &SessionEvent) -> Outcome<State> {
        let _ = event;
        Handled
    }

    #[state]
    fn rolled_back(event: &SessionEvent) -> Outcome<State> {
        let _ = event;
        Handled
    }

    #[state]
    fn orphaned(event: &SessionEvent) -> Outcome<State> {
        let _ = event;
        Handled
    }
}

impl SessionLifecycle {
    fn begin_rollback(&mut self, kind: &str, message: &str) -> Outcome<State> {
        self.record_failure(kind, message);
        self.advance(ProvisioningPhase::RollingBack);
        Transition(State::rolling_back())
    }

    pub fn phase(&self) -> ProvisioningPhase {
        self.phase
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn rollback_failed(&self) -> bool {
        self.phase == ProvisioningPhase::RollbackFailed
    }

    /// Whether a failure right now has to delete the remote repository.
    pub fn requires_rollback(&self) -> bool {
        matches!(
            self.phase,
            ProvisioningPhase::RemoteCreated
                | ProvisioningPhase::Cloned
                | ProvisioningPhase::BranchResolved
                | ProvisioningPhase::Published
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail(kind: &'static str) -> SessionEvent {
        SessionEvent::Fail {
            kind,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_happy_path_reaches_succeeded() {
        let mut sm = SessionLifecycle::new("c-1").state_machine();
        sm.handle(&SessionEvent::ExistenceChecked);
        sm.handle(&SessionEvent::RemoteCreated);
        sm.handle(&SessionEvent::Cloned);
        sm.handle(&SessionEvent::BranchResolved {
            branch: "release-1.0".to_string(),
        });
        sm.handle(&SessionEvent::Published);
        sm.handle(&SessionEvent::Tagged);
        sm.handle(&SessionEvent::Complete);

        assert_eq!(sm.inner().phase(), ProvisioningPhase::Succeeded);
        assert_eq!(sm.inner().branch(), Some("release-1.0"));
        assert!(sm.inner().errors().is_empty());
    }

    #[test]
    fn test_failure_before_creation_aborts() {
        let mut sm = SessionLifecycle::new("c-2").state_machine();
        assert!(!sm.inner().requires_rollback());
        sm.handle(&fail("remote_exists"));

        assert_eq!(sm.inner().phase(), ProvisioningPhase::Aborted);
        assert_eq!(sm.inner().errors(), ["remote_exists: boom".to_string()]);

        // terminal states ignore further events
        sm.handle(&SessionEvent::RemoteCreated);
        assert_eq!(sm.inner().phase(), ProvisioningPhase::Aborted);
    }

    #[test]
    fn test_failure_after_creation_rolls_back() {
        let mut sm = SessionLifecycle::new("c-3").state_machine();
        sm.handle(&SessionEvent::ExistenceChecked);
        sm.handle(&SessionEvent::RemoteCreated);
        assert!(sm.inner().requires_rollback());
        sm.handle(&SessionEvent::Cloned);
        sm.handle(&fail("no_containing_branch"));
        assert_eq!(sm.inner().phase(), ProvisioningPhase::RollingBack);

        // nothing but the rollback result leaves rolling_back
        sm.handle(&SessionEvent::Complete);
        assert_eq!(sm.inner().phase(), ProvisioningPhase::RollingBack);

        sm.handle(&SessionEvent::RollbackFinished { succeeded: true });
        assert_eq!(sm.inner().phase(), ProvisioningPhase::RolledBack);
        assert!(!sm.inner().rollback_failed());
        assert!(sm.inner().phase().is_terminal());
    }

    #[test]
    fn test_failed_rollback_has_its_own_phase() {
        let mut sm = SessionLifecycle::new("c-5").state_machine();
        sm.handle(&SessionEvent::ExistenceChecked);
        sm.handle(&SessionEvent::RemoteCreated);
        sm.handle(&fail("push"));
        sm.handle(&SessionEvent::RollbackFinished { succeeded: false });

        assert_eq!(sm.inner().phase(), ProvisioningPhase::RollbackFailed);
        assert!(sm.inner().rollback_failed());
        assert!(sm.inner().phase().is_terminal());

        sm.handle(&SessionEvent::RollbackFinished { succeeded: true });
        assert_eq!(sm.inner().phase(), ProvisioningPhase::RollbackFailed);
    }

    #[test]
    fn test_unconfirmed_creation_goes_through_rollback() {
        let mut sm = SessionLifecycle::new("c-6").state_machine();
        sm.handle(&SessionEvent::ExistenceChecked);
        sm.handle(&SessionEvent::CreationUnconfirmed {
            kind: "remote_creation_unconfirmed",
            message: "timed out".to_string(),
        });
        assert_eq!(sm.inner().phase(), ProvisioningPhase::RollingBack);
        assert_eq!(sm.inner().errors(), ["remote_creation_unconfirmed: timed out".to_string()]);

        sm.handle(&SessionEvent::RollbackFinished { succeeded: true });
        assert_eq!(sm.inner().phase(), ProvisioningPhase::RolledBack);
    }

    #[test]
    fn test_out_of_order_events_are_ignored() {
        let mut sm = SessionLifecycle::new("c-4").state_machine();
        sm.handle(&SessionEvent::Tagged);
        sm.handle(&SessionEvent::Complete);
        assert_eq!(sm.inner().phase(), ProvisioningPhase::Start);
    }
}

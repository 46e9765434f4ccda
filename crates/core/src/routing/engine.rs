use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::routing::states::{RoutingAction, RoutingEvent, RoutingState, TransitionOutcome};

#[derive(Clone, Copy, Debug, Default)]
pub struct RoutingEngine;

impl RoutingEngine {
    pub fn initial_state(&self) -> RoutingState {
        RoutingState::Start
    }

    pub fn apply(
        &self,
        current: RoutingState,
        event: RoutingEvent,
    ) -> Result<TransitionOutcome, RoutingTransitionError> {
        transition(current, event)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: RoutingState,
        event: RoutingEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, RoutingTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event);
        if let Err(error) = &result {
            sink.emit(
                AuditEvent::new(
                    audit.correlation_id.clone(),
                    "routing.transition_rejected",
                    AuditCategory::Routing,
                    audit.actor.clone(),
                    AuditOutcome::Rejected,
                )
                .with_metadata("error", error.to_string()),
            );
        }
        result
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoutingTransitionError {
    #[error("invalid routing transition from {state:?} using event {event:?}")]
    InvalidTransition { state: RoutingState, event: RoutingEvent },
}

fn transition(
    current: RoutingState,
    event: RoutingEvent,
) -> Result<TransitionOutcome, RoutingTransitionError> {
    use RoutingAction::{
        CheckAccess, ClassifyQuery, EmitLoginPrompt, InvokeHandler, ReduceResponses,
        SubstituteSafeMessage,
    };
    use RoutingEvent::{
        AccessDenied, Classified, HandlerCompleted, HandlerFailed, HandlerSelected,
        IdentityResolved,
    };
    use RoutingState as S;

    let (to, actions) = match (current, event) {
        (S::Start, IdentityResolved) => (S::IdentityResolved, vec![ClassifyQuery]),
        (S::IdentityResolved, Classified) => (S::Classified, vec![CheckAccess]),
        (S::Classified, HandlerSelected) => (S::Dispatched, vec![InvokeHandler]),
        (S::Classified, AccessDenied) => (S::Denied, vec![EmitLoginPrompt]),
        (S::Dispatched, HandlerCompleted) => (S::Finalized, vec![ReduceResponses]),
        (S::Dispatched, HandlerFailed) => {
            (S::Finalized, vec![SubstituteSafeMessage, ReduceResponses])
        }
        _ => return Err(RoutingTransitionError::InvalidTransition { state: current, event }),
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::routing::engine::{RoutingEngine, RoutingTransitionError};
    use crate::routing::states::{RoutingAction, RoutingEvent, RoutingState};

    #[test]
    fn happy_path_reaches_finalized() {
        let engine = RoutingEngine;
        let mut state = engine.initial_state();
        for event in [
            RoutingEvent::IdentityResolved,
            RoutingEvent::Classified,
            RoutingEvent::HandlerSelected,
            RoutingEvent::HandlerCompleted,
        ] {
            state = engine.apply(state, event).expect("valid transition").to;
        }
        assert_eq!(state, RoutingState::Finalized);
        assert!(state.is_terminal());
    }

    #[test]
    fn access_denied_short_circuits_dispatch() {
        let outcome = RoutingEngine
            .apply(RoutingState::Classified, RoutingEvent::AccessDenied)
            .expect("classified -> denied");
        assert_eq!(outcome.to, RoutingState::Denied);
        assert_eq!(outcome.actions, vec![RoutingAction::EmitLoginPrompt]);
    }

    #[test]
    fn handler_failure_still_finalizes() {
        let outcome = RoutingEngine
            .apply(RoutingState::Dispatched, RoutingEvent::HandlerFailed)
            .expect("dispatched -> finalized");
        assert_eq!(outcome.to, RoutingState::Finalized);
        assert!(outcome.actions.contains(&RoutingAction::SubstituteSafeMessage));
    }

    #[test]
    fn classification_cannot_precede_identity_resolution() {
        let error = RoutingEngine
            .apply(RoutingState::Start, RoutingEvent::Classified)
            .expect_err("start cannot classify before identity resolution");
        assert_eq!(
            error,
            RoutingTransitionError::InvalidTransition {
                state: RoutingState::Start,
                event: RoutingEvent::Classified
            }
        );
    }

    #[test]
    fn terminal_states_accept_no_further_events() {
        for event in [RoutingEvent::HandlerSelected, RoutingEvent::HandlerCompleted] {
            assert!(RoutingEngine.apply(RoutingState::Denied, event).is_err());
            assert!(RoutingEngine.apply(RoutingState::Finalized, event).is_err());
        }
    }

    #[test]
    fn rejected_transition_is_audited() {
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new("req-9", "routing-engine");
        let result = RoutingEngine.apply_with_audit(
            RoutingState::Denied,
            RoutingEvent::HandlerSelected,
            &sink,
            &audit,
        );

        assert!(result.is_err());
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "routing.transition_rejected");
        assert_eq!(events[0].correlation_id, "req-9");
    }
}

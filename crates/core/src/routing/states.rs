use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingState {
    Start,
    IdentityResolved,
    Classified,
    Dispatched,
    Finalized,
    Denied,
}

impl RoutingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::IdentityResolved => "identity_resolved",
            Self::Classified => "classified",
            Self::Dispatched => "dispatched",
            Self::Finalized => "finalized",
            Self::Denied => "denied",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Denied)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingEvent {
    IdentityResolved,
    Classified,
    HandlerSelected,
    AccessDenied,
    HandlerCompleted,
    HandlerFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAction {
    ClassifyQuery,
    CheckAccess,
    InvokeHandler,
    EmitLoginPrompt,
    SubstituteSafeMessage,
    ReduceResponses,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: RoutingState,
    pub to: RoutingState,
    pub event: RoutingEvent,
    pub actions: Vec<RoutingAction>,
}

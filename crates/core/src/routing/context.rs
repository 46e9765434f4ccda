use uuid::Uuid;

use crate::domain::identity::{Identity, Role, SubjectId};
use crate::domain::intent::Intent;
use crate::routing::classifier::Classification;
use crate::routing::reducer::Responses;
use crate::routing::states::RoutingState;

/// Caller-facing input to the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
    pub caller_email: Option<String>,
    pub channel_hint: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    pub fn from_caller(mut self, email: impl Into<String>) -> Self {
        self.caller_email = Some(email.into());
        self
    }

    pub fn with_channel_hint(mut self, hint: impl Into<String>) -> Self {
        self.channel_hint = Some(hint.into());
        self
    }
}

/// Per-request unit of work. Built fresh for every query and dropped once the answer is
/// returned; nothing in here is shared between requests.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub correlation_id: String,
    pub query: String,
    pub channel_hint: Option<String>,
    pub caller_email: Option<String>,
    pub identity: Option<Identity>,
    pub classification: Option<Classification>,
    /// Set only once the access policy admits the selected handler.
    pub handler: Option<&'static str>,
    pub responses: Responses,
    pub final_answer: Option<String>,
    pub state: RoutingState,
    pub trace: Vec<RoutingState>,
}

impl RequestContext {
    pub fn new(request: QueryRequest) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            query: request.query,
            channel_hint: request.channel_hint,
            caller_email: request.caller_email,
            identity: None,
            classification: None,
            handler: None,
            responses: Responses::default(),
            final_answer: None,
            state: RoutingState::Start,
            trace: vec![RoutingState::Start],
        }
    }

    pub fn role(&self) -> Role {
        self.identity.as_ref().map(|identity| identity.role).unwrap_or(Role::Unknown)
    }

    pub fn subject_id(&self) -> Option<&SubjectId> {
        self.identity.as_ref().and_then(|identity| identity.subject_id.as_ref())
    }

    pub fn intent(&self) -> Option<Intent> {
        self.classification.map(|classification| classification.intent)
    }

    pub fn actor(&self) -> String {
        match &self.identity {
            Some(identity) => identity.actor_label(),
            None => "anonymous".to_string(),
        }
    }
}

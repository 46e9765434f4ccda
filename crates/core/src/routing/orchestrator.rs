use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::access::{AccessDecision, AccessPolicy, AccessRequest};
use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink};
use crate::domain::identity::Role;
use crate::domain::intent::Intent;
use crate::errors::{ApplicationError, DomainError, RoutingError};
use crate::ports::{HandlerRequest, HandlerSet};
use crate::routing::classifier::IntentClassifier;
use crate::routing::context::{QueryRequest, RequestContext};
use crate::routing::engine::{RoutingEngine, RoutingTransitionError};
use crate::routing::reducer::reduce;
use crate::routing::resolver::IdentityResolver;
use crate::routing::states::{RoutingEvent, RoutingState};

/// The pipeline result. `text` is always non-empty and user-safe.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Answer {
    pub correlation_id: String,
    pub role: Role,
    pub intent: Option<Intent>,
    pub handler: Option<&'static str>,
    pub terminal: RoutingState,
    pub text: String,
    pub trace: Vec<RoutingState>,
}

impl Answer {
    pub fn is_denied(&self) -> bool {
        self.terminal == RoutingState::Denied
    }
}

/// Resolve, classify, guard, dispatch, reduce. Holds only read-only collaborators, so one
/// instance can serve concurrent requests.
#[derive(Clone)]
pub struct Orchestrator {
    resolver: IdentityResolver,
    classifier: IntentClassifier,
    handlers: HandlerSet,
    access: AccessPolicy,
    engine: RoutingEngine,
    audit: Arc<dyn AuditSink>,
}

impl Orchestrator {
    pub fn new(resolver: IdentityResolver, handlers: HandlerSet) -> Self {
        Self {
            resolver,
            classifier: IntentClassifier::default(),
            handlers,
            access: AccessPolicy::default(),
            engine: RoutingEngine,
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_access_policy(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Never fails: every error is absorbed into a user-safe answer.
    pub async fn handle(&self, request: QueryRequest) -> Answer {
        let mut context = RequestContext::new(request);

        if let Err(error) = self.run(&mut context).await {
            let interface = ApplicationError::from(DomainError::from(error))
                .into_interface(context.correlation_id.clone());
            warn!(
                event_name = "routing.internal_error",
                correlation_id = %context.correlation_id,
                state = context.state.as_str(),
                error = %interface,
                "routing pipeline aborted"
            );
            context.final_answer = Some(interface.user_message().to_string());
        }

        let text = match context.final_answer.take() {
            Some(text) if !text.trim().is_empty() => text,
            _ => reduce(&context.responses),
        };

        Answer {
            role: context.role(),
            intent: context.intent(),
            handler: context.handler,
            terminal: context.state,
            correlation_id: context.correlation_id,
            text,
            trace: context.trace,
        }
    }

    async fn run(&self, context: &mut RequestContext) -> Result<(), RoutingTransitionError> {
        let identity = self.resolver.resolve(context.caller_email.as_deref()).await;
        let role = identity.role;
        let subject_id = identity.subject_id.clone();
        context.identity = Some(identity);
        self.advance(context, RoutingEvent::IdentityResolved)?;
        self.record(
            context,
            "routing.identity_resolved",
            AuditCategory::Identity,
            AuditOutcome::Success,
            &[("role", role.as_str().to_string())],
        );

        let classification =
            self.classifier.classify(&context.query, context.channel_hint.as_deref());
        context.classification = Some(classification);
        self.advance(context, RoutingEvent::Classified)?;
        info!(
            event_name = "routing.classified",
            correlation_id = %context.correlation_id,
            role = role.as_str(),
            intent = classification.intent.as_str(),
            source = ?classification.source,
            "query classified"
        );
        self.record(
            context,
            "routing.classified",
            AuditCategory::Routing,
            AuditOutcome::Success,
            &[
                ("intent", classification.intent.as_str().to_string()),
                ("source", format!("{:?}", classification.source)),
            ],
        );

        let handler = Arc::clone(self.handlers.for_intent(classification.intent));

        let decision = self.access.evaluate(&AccessRequest {
            handler: handler.name(),
            requires_identity: handler.requires_identity(),
            role,
            subject_id: subject_id.as_ref(),
        });
        if let AccessDecision::Deny { error, user_message, fallback_path } = decision {
            self.advance(context, RoutingEvent::AccessDenied)?;
            info!(
                event_name = "routing.denied",
                correlation_id = %context.correlation_id,
                handler = handler.name(),
                reason_code = error.reason_code(),
                fallback_path,
                "handler dispatch denied"
            );
            self.record(
                context,
                "routing.denied",
                AuditCategory::Access,
                AuditOutcome::Rejected,
                &[
                    ("handler", handler.name().to_string()),
                    ("reason_code", error.reason_code().to_string()),
                    ("fallback_path", fallback_path.to_string()),
                ],
            );
            context.final_answer = Some(user_message);
            return Ok(());
        }

        self.advance(context, RoutingEvent::HandlerSelected)?;
        context.handler = Some(handler.name());
        let request = HandlerRequest {
            correlation_id: context.correlation_id.clone(),
            query: context.query.clone(),
            role,
            subject_id,
        };

        let failure = match handler.handle(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                context.responses.insert(handler.name(), text);
                None
            }
            Ok(_) => Some("handler returned an empty response".to_string()),
            Err(error) => Some(error.to_string()),
        };

        match failure {
            None => self.advance(context, RoutingEvent::HandlerCompleted)?,
            Some(detail) => {
                let error = RoutingError::HandlerFailure { handler: handler.name(), detail };
                warn!(
                    event_name = "routing.handler_failed",
                    correlation_id = %context.correlation_id,
                    handler = handler.name(),
                    error = %error,
                    "handler failed; substituting user-safe message"
                );
                self.record(
                    context,
                    "routing.handler_failed",
                    AuditCategory::Handler,
                    AuditOutcome::Failed,
                    &[("handler", handler.name().to_string())],
                );
                context.responses.insert(handler.name(), error.user_message());
                self.advance(context, RoutingEvent::HandlerFailed)?;
            }
        }

        context.final_answer = Some(reduce(&context.responses));
        self.record(
            context,
            "routing.finalized",
            AuditCategory::Routing,
            AuditOutcome::Success,
            &[("handler", handler.name().to_string())],
        );
        Ok(())
    }

    fn advance(
        &self,
        context: &mut RequestContext,
        event: RoutingEvent,
    ) -> Result<(), RoutingTransitionError> {
        let audit = AuditContext::new(context.correlation_id.clone(), context.actor());
        let outcome =
            self.engine.apply_with_audit(context.state, event, self.audit.as_ref(), &audit)?;
        debug!(
            event_name = "routing.transition",
            correlation_id = %context.correlation_id,
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            "routing state advanced"
        );
        context.state = outcome.to;
        context.trace.push(outcome.to);
        Ok(())
    }

    fn record(
        &self,
        context: &RequestContext,
        event_type: &str,
        category: AuditCategory,
        outcome: AuditOutcome,
        metadata: &[(&str, String)],
    ) {
        let event = metadata.iter().fold(
            AuditEvent::new(
                context.correlation_id.clone(),
                event_type,
                category,
                context.actor(),
                outcome,
            )
            .with_metadata("state", context.state.as_str()),
            |event, (key, value)| event.with_metadata(*key, value.clone()),
        );
        self.audit.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::Orchestrator;
    use crate::audit::InMemoryAuditSink;
    use crate::domain::account::{AccountStatus, AdminDashboard, CustomerProfile};
    use crate::domain::identity::{CustomerId, Role};
    use crate::domain::intent::Intent;
    use crate::errors::{HandlerError, StoreError};
    use crate::ports::{Handler, HandlerRequest, HandlerSet, IdentityStore};
    use crate::routing::context::QueryRequest;
    use crate::routing::resolver::IdentityResolver;
    use crate::routing::states::RoutingState;

    struct FakeStore {
        customers: HashMap<String, CustomerId>,
    }

    #[async_trait]
    impl IdentityStore for FakeStore {
        async fn lookup_role(&self, email: &str) -> Result<Option<Role>, StoreError> {
            if email == "admin@x" {
                return Ok(Some(Role::Admin));
            }
            Ok(self.customers.get(email).map(|_| Role::Customer))
        }

        async fn lookup_customer_id(&self, email: &str) -> Result<Option<CustomerId>, StoreError> {
            Ok(self.customers.get(email).cloned())
        }

        async fn lookup_customer_profile(
            &self,
            id: &CustomerId,
        ) -> Result<Option<CustomerProfile>, StoreError> {
            Ok(self.customers.iter().find(|(_, candidate)| *candidate == id).map(|(email, id)| {
                CustomerProfile {
                    customer_id: id.clone(),
                    email: email.clone(),
                    full_name: "Test".into(),
                    phone_number: None,
                    address: None,
                    status: AccountStatus::Active,
                    registration_date: None,
                    plan: None,
                }
            }))
        }

        async fn lookup_admin_dashboard(&self) -> Result<AdminDashboard, StoreError> {
            Ok(AdminDashboard::default())
        }
    }

    enum Behaviour {
        EchoSubject,
        Fail,
        Empty,
    }

    struct RecordingHandler {
        name: &'static str,
        requires_identity: bool,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl RecordingHandler {
        fn new(name: &'static str, requires_identity: bool, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self { name, requires_identity, behaviour, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Handler for RecordingHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        fn requires_identity(&self) -> bool {
            self.requires_identity
        }

        async fn handle(&self, request: &HandlerRequest) -> Result<String, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::EchoSubject => Ok(format!(
                    "{} answer for {}",
                    self.name,
                    request.subject_id.as_ref().map(|id| id.as_str()).unwrap_or("nobody")
                )),
                Behaviour::Fail => {
                    Err(HandlerError::Llm("upstream 500: internal stack trace".into()))
                }
                Behaviour::Empty => Ok("   ".into()),
            }
        }
    }

    struct Fixture {
        orchestrator: Orchestrator,
        billing: Arc<RecordingHandler>,
        network: Arc<RecordingHandler>,
        knowledge: Arc<RecordingHandler>,
        audit: InMemoryAuditSink,
    }

    fn fixture(billing: Behaviour) -> Fixture {
        let store = FakeStore {
            customers: HashMap::from([
                ("john@x".to_string(), CustomerId("CUST001".into())),
                ("jane@x".to_string(), CustomerId("CUST002".into())),
            ]),
        };
        let billing = RecordingHandler::new("billing", true, billing);
        let network = RecordingHandler::new("network", true, Behaviour::EchoSubject);
        let plan = RecordingHandler::new("plan", true, Behaviour::EchoSubject);
        let knowledge = RecordingHandler::new("knowledge", false, Behaviour::EchoSubject);
        let audit = InMemoryAuditSink::default();

        let orchestrator = Orchestrator::new(
            IdentityResolver::new(Arc::new(store)),
            HandlerSet {
                billing: billing.clone(),
                network: network.clone(),
                plan,
                knowledge: knowledge.clone(),
            },
        )
        .with_audit_sink(Arc::new(audit.clone()));

        Fixture { orchestrator, billing, network, knowledge, audit }
    }

    #[tokio::test]
    async fn customer_billing_query_is_finalized_with_own_subject() {
        let fixture = fixture(Behaviour::EchoSubject);
        let answer =
            fixture.orchestrator.handle(QueryRequest::new("What's my bill?").from_caller("jane@x")).await;

        assert_eq!(answer.terminal, RoutingState::Finalized);
        assert_eq!(answer.intent, Some(Intent::Billing));
        assert_eq!(answer.role, Role::Customer);
        assert_eq!(answer.text, "billing answer for CUST002");
        assert_eq!(
            answer.trace,
            vec![
                RoutingState::Start,
                RoutingState::IdentityResolved,
                RoutingState::Classified,
                RoutingState::Dispatched,
                RoutingState::Finalized,
            ]
        );
    }

    #[tokio::test]
    async fn unknown_caller_is_denied_without_invoking_handler() {
        let fixture = fixture(Behaviour::EchoSubject);
        for email in [None, Some("stranger@x")] {
            let mut request = QueryRequest::new("What's my bill?");
            request.caller_email = email.map(str::to_string);
            let answer = fixture.orchestrator.handle(request).await;

            assert!(answer.is_denied());
            assert!(answer.text.contains("log in"));
            assert_eq!(answer.trace.last(), Some(&RoutingState::Denied));
            assert_eq!(answer.handler, None);
        }
        assert_eq!(fixture.billing.calls(), 0);

        let denied = fixture
            .audit
            .events()
            .into_iter()
            .filter(|event| event.event_type == "routing.denied")
            .count();
        assert_eq!(denied, 2);
    }

    #[tokio::test]
    async fn network_queries_require_identity() {
        let fixture = fixture(Behaviour::EchoSubject);
        let answer = fixture.orchestrator.handle(QueryRequest::new("My internet is slow")).await;
        assert!(answer.is_denied());
        assert_eq!(fixture.network.calls(), 0);
    }

    #[tokio::test]
    async fn knowledge_is_answered_for_anonymous_callers() {
        let fixture = fixture(Behaviour::EchoSubject);
        let answer = fixture.orchestrator.handle(QueryRequest::new("What is 5G?")).await;
        assert_eq!(answer.terminal, RoutingState::Finalized);
        assert_eq!(answer.text, "knowledge answer for nobody");
        assert_eq!(fixture.knowledge.calls(), 1);
    }

    #[tokio::test]
    async fn admin_reaches_handlers_in_aggregate_scope() {
        let fixture = fixture(Behaviour::EchoSubject);
        let answer =
            fixture.orchestrator.handle(QueryRequest::new("Show billing").from_caller("admin@x")).await;
        assert_eq!(answer.role, Role::Admin);
        assert_eq!(answer.text, "billing answer for ADMIN");
    }

    #[tokio::test]
    async fn handler_failure_is_absorbed_and_finalized() {
        let fixture = fixture(Behaviour::Fail);
        let answer =
            fixture.orchestrator.handle(QueryRequest::new("What's my bill?").from_caller("john@x")).await;

        assert_eq!(answer.terminal, RoutingState::Finalized);
        assert!(!answer.text.is_empty());
        assert!(!answer.text.contains("stack trace"));
        assert!(fixture
            .audit
            .events_for(&answer.correlation_id)
            .iter()
            .any(|event| event.event_type == "routing.handler_failed"));
    }

    #[tokio::test]
    async fn empty_handler_output_counts_as_failure() {
        let fixture = fixture(Behaviour::Empty);
        let answer =
            fixture.orchestrator.handle(QueryRequest::new("payment").from_caller("john@x")).await;
        assert_eq!(answer.terminal, RoutingState::Finalized);
        assert!(answer.text.starts_with("Sorry"));
    }

    #[tokio::test]
    async fn channel_hint_routes_over_text() {
        let fixture = fixture(Behaviour::EchoSubject);
        let answer = fixture
            .orchestrator
            .handle(
                QueryRequest::new("What's my bill?").from_caller("john@x").with_channel_hint("network"),
            )
            .await;
        assert_eq!(answer.intent, Some(Intent::Network));
        assert_eq!(answer.text, "network answer for CUST001");
        assert_eq!(fixture.billing.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_requests_keep_their_own_subject() {
        let fixture = fixture(Behaviour::EchoSubject);
        let (john, jane) = tokio::join!(
            fixture.orchestrator.handle(QueryRequest::new("bill").from_caller("john@x")),
            fixture.orchestrator.handle(QueryRequest::new("bill").from_caller("jane@x")),
        );
        assert_eq!(john.text, "billing answer for CUST001");
        assert_eq!(jane.text, "billing answer for CUST002");
        assert_ne!(john.correlation_id, jane.correlation_id);
    }

    #[tokio::test]
    async fn every_finalized_request_emits_lifecycle_audit_events() {
        let fixture = fixture(Behaviour::EchoSubject);
        let answer =
            fixture.orchestrator.handle(QueryRequest::new("upgrade").from_caller("john@x")).await;
        let types: Vec<String> = fixture
            .audit
            .events_for(&answer.correlation_id)
            .into_iter()
            .map(|event| event.event_type)
            .collect();
        assert_eq!(types, vec!["routing.identity_resolved", "routing.classified", "routing.finalized"]);
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use teleassist_agent::handlers::knowledge::NO_DOCUMENTATION;
use teleassist_agent::llm::{FailingLlmClient, LlmClient, OfflineLlmClient};
use teleassist_agent::{AssistantRuntime, DocumentIndex};
use teleassist_core::audit::InMemoryAuditSink;
use teleassist_core::routing::{QueryRequest, RoutingState};
use teleassist_core::{Intent, Role, RoutingError};
use teleassist_db::{connect_with_settings, migrations, DbPool, DemoSeedDataset, SqlCustomerStore};

const JANE: &str = "jane.smith@email.com";
const JOHN: &str = "john.doe@email.com";
const SAM: &str = "sam.lee@email.com";
const ADMIN: &str = "admin@telecom.com";

async fn seeded_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    DemoSeedDataset::load(&pool).await.expect("seed");
    pool
}

fn documents_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/documents")
}

async fn runtime_with(pool: DbPool, llm: Arc<dyn LlmClient>) -> AssistantRuntime {
    let index = DocumentIndex::load_dir(&documents_dir()).await.expect("load documents");
    AssistantRuntime::new(Arc::new(SqlCustomerStore::new(pool)), llm, Arc::new(index), 3)
        .expect("runtime builds")
}

async fn offline_runtime() -> AssistantRuntime {
    runtime_with(seeded_pool().await, Arc::new(OfflineLlmClient)).await
}

#[tokio::test]
async fn known_customer_bill_is_short_and_their_own() {
    let runtime = offline_runtime().await;
    let answer = runtime.ask(QueryRequest::new("What's my bill?").from_caller(JANE)).await;

    assert_eq!(answer.role, Role::Customer);
    assert_eq!(answer.intent, Some(Intent::Billing));
    assert_eq!(answer.handler, Some("billing"));
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
    assert!(answer.text.contains("80.99"), "{}", answer.text);
    assert!(answer.text.lines().count() <= 5, "{}", answer.text);
    for other in ["45.99", "25.99", "48.49"] {
        assert!(!answer.text.contains(other), "leaked {other}: {}", answer.text);
    }
}

#[tokio::test]
async fn suspended_customer_network_issue_names_the_suspension() {
    let runtime = offline_runtime().await;
    let answer = runtime.ask(QueryRequest::new("My internet is slow").from_caller(SAM)).await;

    assert_eq!(answer.intent, Some(Intent::Network));
    assert_eq!(answer.terminal, RoutingState::Finalized);
    let lowered = answer.text.to_lowercase();
    assert!(lowered.contains("suspended"), "{}", answer.text);
    assert!(lowered.contains("reactivate"));
    assert!(!answer.text.contains("Known issue"), "{}", answer.text);
    assert!(!answer.text.contains("restart device"));
}

#[tokio::test]
async fn active_customer_network_issue_gets_diagnostics() {
    let runtime = offline_runtime().await;
    let answer = runtime.ask(QueryRequest::new("My internet is slow").from_caller(JOHN)).await;

    assert!(answer.text.contains("Account status: Active"), "{}", answer.text);
    assert!(answer.text.contains("Slow Data"));
    assert!(answer.text.contains("INC-2025-0142"));
}

#[tokio::test]
async fn unauthenticated_personal_queries_are_denied() {
    let runtime = offline_runtime().await;
    let login = RoutingError::IdentityNotFound.user_message();

    for request in [
        QueryRequest::new("What's my bill?"),
        QueryRequest::new("Recommend a plan for me").from_caller("stranger@email.com"),
        QueryRequest::new("My internet is slow").from_caller("   "),
    ] {
        let answer = runtime.ask(request).await;
        assert_eq!(answer.terminal, RoutingState::Denied);
        assert_eq!(answer.role, Role::Unknown);
        assert_eq!(answer.handler, None);
        assert_eq!(answer.text, login);
        assert_eq!(
            answer.trace,
            vec![
                RoutingState::Start,
                RoutingState::IdentityResolved,
                RoutingState::Classified,
                RoutingState::Denied,
            ]
        );
    }
}

#[tokio::test]
async fn store_outage_fails_closed() {
    let pool = seeded_pool().await;
    let runtime = runtime_with(pool.clone(), Arc::new(OfflineLlmClient)).await;
    pool.close().await;

    let answer = runtime.ask(QueryRequest::new("What's my bill?").from_caller(JANE)).await;
    assert_eq!(answer.role, Role::Unknown);
    assert!(answer.is_denied());
    assert!(!answer.text.contains("80.99"));
}

#[tokio::test]
async fn classification_order_and_hints_hold_end_to_end() {
    let runtime = offline_runtime().await;

    let mixed = runtime
        .ask(QueryRequest::new("Why is my data bill so high?").from_caller(JANE))
        .await;
    assert_eq!(mixed.intent, Some(Intent::Billing));

    let hinted = runtime
        .ask(QueryRequest::new("What's my bill?").from_caller(JANE).with_channel_hint("network"))
        .await;
    assert_eq!(hinted.intent, Some(Intent::Network));
    assert_eq!(hinted.handler, Some("network"));

    let fallback = runtime.ask(QueryRequest::new("What is 5G?")).await;
    assert_eq!(fallback.intent, Some(Intent::Knowledge));
    assert_eq!(fallback.terminal, RoutingState::Finalized);
    assert!(fallback.text.contains("[network_generations.md]"), "{}", fallback.text);
}

#[tokio::test]
async fn off_topic_knowledge_questions_admit_missing_documentation() {
    let runtime = offline_runtime().await;
    let answer = runtime.ask(QueryRequest::new("Tell me a joke about penguins")).await;

    assert_eq!(answer.intent, Some(Intent::Knowledge));
    assert_eq!(answer.terminal, RoutingState::Finalized);
    assert_eq!(answer.text, NO_DOCUMENTATION);
}

#[tokio::test]
async fn knowledge_answers_come_from_local_documents() {
    let runtime = offline_runtime().await;
    let answer = runtime.ask(QueryRequest::new("How do I enable roaming abroad?")).await;

    assert_eq!(answer.intent, Some(Intent::Knowledge));
    assert_eq!(answer.role, Role::Unknown);
    assert!(answer.text.contains("[roaming.md]"), "{}", answer.text);
}

#[tokio::test]
async fn admin_gets_aggregates_never_personal_records() {
    let runtime = offline_runtime().await;

    let billing = runtime.ask(QueryRequest::new("What's my bill?").from_caller(ADMIN)).await;
    assert_eq!(billing.role, Role::Admin);
    assert_eq!(billing.terminal, RoutingState::Finalized);
    assert!(billing.text.starts_with("Billing overview: 3 customers"), "{}", billing.text);
    assert!(!billing.text.contains("80.99"));
    assert!(!billing.text.contains("CUST00"));

    let view = runtime.account_view(ADMIN).await.expect("account view");
    let json = serde_json::to_value(&view).expect("serialize view");
    assert_eq!(json["role"], "admin");
    assert_eq!(json["dashboard"]["total_customers"], 3);
    assert!(json.get("profile").is_none());
}

#[tokio::test]
async fn handler_failure_is_absorbed_into_a_safe_answer() {
    let llm = Arc::new(FailingLlmClient::default());
    let audit = InMemoryAuditSink::default();
    let runtime = runtime_with(seeded_pool().await, llm.clone())
        .await
        .with_audit_sink(Arc::new(audit.clone()));

    let answer = runtime
        .ask(QueryRequest::new("Explain my charges in detail").from_caller(JANE))
        .await;

    assert_eq!(answer.terminal, RoutingState::Finalized);
    assert_eq!(answer.text, RoutingError::HandlerFailure {
        handler: "billing",
        detail: String::new(),
    }
    .user_message());
    assert!(!answer.text.contains("language model"));
    assert!(llm.calls() >= 1);

    let events = audit.events_for(&answer.correlation_id);
    let types = events.iter().map(|event| event.event_type.as_str()).collect::<Vec<_>>();
    assert!(types.contains(&"routing.handler_failed"), "{types:?}");
    assert_eq!(types.last(), Some(&"routing.finalized"));
}

#[tokio::test]
async fn concurrent_requests_keep_their_own_identity() {
    let runtime = offline_runtime().await;

    for _ in 0..5 {
        let (jane, john, anon) = tokio::join!(
            runtime.ask(QueryRequest::new("What's my bill?").from_caller(JANE)),
            runtime.ask(QueryRequest::new("What's my bill?").from_caller(JOHN)),
            runtime.ask(QueryRequest::new("What's my bill?")),
        );
        assert!(jane.text.contains("80.99") && !jane.text.contains("45.99"), "{}", jane.text);
        assert!(john.text.contains("45.99") && !john.text.contains("80.99"), "{}", john.text);
        assert!(anon.is_denied());
        assert_ne!(jane.correlation_id, john.correlation_id);
    }
}

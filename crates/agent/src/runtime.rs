use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::Serialize;
use tracing::info;

use teleassist_core::access::AccessPolicy;
use teleassist_core::audit::AuditSink;
use teleassist_core::config::AppConfig;
use teleassist_core::domain::account::{AdminDashboard, CustomerProfile, UsageRecord};
use teleassist_core::domain::identity::{AnonymousReason, IdentityProfile};
use teleassist_core::errors::{HandlerError, RoutingError, StoreError};
use teleassist_core::ports::{CustomerStore, IdentityStore};
use teleassist_core::routing::{Answer, IdentityResolver, Orchestrator, QueryRequest};
use teleassist_db::{DbPool, SqlCustomerStore};

use crate::handlers::{build_handler_set, HandlerContext};
use crate::llm::{build_llm_client, LlmClient};
use crate::retrieval::{DocumentIndex, KnowledgeRetriever};

pub const ACCOUNT_HISTORY_PERIODS: u32 = 6;

/// What `account` shows a caller: admins get the aggregate dashboard, customers their own
/// profile and recent usage, everyone else a login prompt.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum AccountView {
    Admin { email: String, dashboard: AdminDashboard },
    Customer { email: String, profile: CustomerProfile, usage_history: Vec<UsageRecord> },
    Unknown { reason: AnonymousReason, message: String },
}

/// Store, handlers and orchestrator wired together. Cheap to share across tasks.
#[derive(Clone)]
pub struct AssistantRuntime {
    orchestrator: Orchestrator,
    store: Arc<dyn CustomerStore>,
    llm_provider: &'static str,
}

impl AssistantRuntime {
    pub fn new<S>(
        store: Arc<S>,
        llm: Arc<dyn LlmClient>,
        retriever: Arc<dyn KnowledgeRetriever>,
        top_k: usize,
    ) -> Result<Self, HandlerError>
    where
        S: CustomerStore + 'static,
    {
        let identity_store: Arc<dyn IdentityStore> = store.clone();
        let customer_store: Arc<dyn CustomerStore> = store;
        let llm_provider = llm.provider();

        let handlers =
            build_handler_set(HandlerContext::new(customer_store.clone(), llm)?, retriever, top_k);
        let orchestrator = Orchestrator::new(IdentityResolver::new(identity_store), handlers);

        Ok(Self { orchestrator, store: customer_store, llm_provider })
    }

    /// Builds the runtime over an already-connected pool: loads the document index and
    /// builds the configured language model client.
    pub async fn from_pool(pool: DbPool, config: &AppConfig) -> Result<Self> {
        let llm = build_llm_client(&config.llm)?;
        let index = DocumentIndex::load_dir(&config.knowledge.documents_path)
            .await
            .with_context(|| {
                format!("failed to load documents from {}", config.knowledge.documents_path.display())
            })?;

        let runtime = Self::new(
            Arc::new(SqlCustomerStore::new(pool)),
            llm,
            Arc::new(index),
            config.knowledge.top_k,
        )?;
        info!(
            event_name = "runtime.ready",
            llm_provider = runtime.llm_provider,
            documents_path = %config.knowledge.documents_path.display(),
            "assistant runtime ready"
        );
        Ok(runtime)
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.orchestrator = self.orchestrator.with_audit_sink(sink);
        self
    }

    pub fn with_access_policy(mut self, policy: AccessPolicy) -> Self {
        self.orchestrator = self.orchestrator.with_access_policy(policy);
        self
    }

    pub fn llm_provider(&self) -> &'static str {
        self.llm_provider
    }

    pub async fn ask(&self, request: QueryRequest) -> Answer {
        self.orchestrator.handle(request).await
    }

    pub async fn account_view(&self, email: &str) -> Result<AccountView, StoreError> {
        let identity = self.orchestrator.resolver().resolve(Some(email)).await;
        match identity.profile {
            IdentityProfile::AdminDashboard(dashboard) => Ok(AccountView::Admin {
                email: identity.email.unwrap_or_default(),
                dashboard,
            }),
            IdentityProfile::Customer(profile) => {
                let usage_history =
                    self.store.usage_history(&profile.customer_id, ACCOUNT_HISTORY_PERIODS).await?;
                Ok(AccountView::Customer {
                    email: identity.email.unwrap_or_default(),
                    profile,
                    usage_history,
                })
            }
            IdentityProfile::Anonymous { reason } => Ok(AccountView::Unknown {
                reason,
                message: RoutingError::IdentityNotFound.user_message().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use teleassist_core::routing::{QueryRequest, RoutingState};
    use teleassist_core::{Intent, Role};

    use super::{AccountView, AssistantRuntime};
    use crate::handlers::testing::store;
    use crate::llm::OfflineLlmClient;
    use crate::retrieval::DocumentIndex;

    async fn runtime() -> AssistantRuntime {
        AssistantRuntime::new(
            store().await,
            Arc::new(OfflineLlmClient),
            Arc::new(DocumentIndex::default()),
            3,
        )
        .expect("runtime builds")
    }

    #[tokio::test]
    async fn ask_runs_the_full_pipeline() {
        let answer = runtime()
            .await
            .ask(QueryRequest::new("What's my bill?").from_caller("jane@x"))
            .await;
        assert_eq!(answer.role, Role::Customer);
        assert_eq!(answer.intent, Some(Intent::Billing));
        assert_eq!(answer.terminal, RoutingState::Finalized);
        assert!(answer.text.contains("$80.99"), "{}", answer.text);
    }

    #[tokio::test]
    async fn account_view_is_scoped_by_role() {
        let runtime = runtime().await;
        assert_eq!(runtime.llm_provider(), "offline");

        match runtime.account_view("jane@x").await.expect("view") {
            AccountView::Customer { profile, usage_history, .. } => {
                assert_eq!(profile.customer_id.as_str(), "CUST002");
                assert_eq!(usage_history.len(), 2);
            }
            other => panic!("expected customer view, got {other:?}"),
        }
        assert!(matches!(
            runtime.account_view("admin@x").await.expect("view"),
            AccountView::Admin { .. }
        ));
        assert!(matches!(
            runtime.account_view("nobody@x").await.expect("view"),
            AccountView::Unknown { .. }
        ));
    }
}

use std::sync::Arc;

use rust_decimal::Decimal;

use teleassist_core::domain::account::AdminDashboard;
use teleassist_core::errors::HandlerError;
use teleassist_core::ports::{CustomerStore, HandlerRequest, HandlerSet};
use teleassist_core::CustomerId;

use crate::guardrails::GroundingPolicy;
use crate::llm::LlmClient;
use crate::prompts::PromptRenderer;
use crate::retrieval::KnowledgeRetriever;

pub mod billing;
pub mod knowledge;
pub mod network;
pub mod plan;

pub use billing::BillingHandler;
pub use knowledge::KnowledgeHandler;
pub use network::NetworkHandler;
pub use plan::PlanHandler;

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: Arc<dyn CustomerStore>,
    pub llm: Arc<dyn LlmClient>,
    pub prompts: Arc<PromptRenderer>,
    pub grounding: GroundingPolicy,
}

impl HandlerContext {
    pub fn new(store: Arc<dyn CustomerStore>, llm: Arc<dyn LlmClient>) -> Result<Self, HandlerError> {
        Ok(Self {
            store,
            llm,
            prompts: Arc::new(PromptRenderer::embedded()?),
            grounding: GroundingPolicy::default(),
        })
    }
}

pub fn build_handler_set(
    context: HandlerContext,
    retriever: Arc<dyn KnowledgeRetriever>,
    top_k: usize,
) -> HandlerSet {
    HandlerSet {
        billing: Arc::new(BillingHandler::new(context.clone())),
        network: Arc::new(NetworkHandler::new(context.clone())),
        plan: Arc::new(PlanHandler::new(context.clone())),
        knowledge: Arc::new(KnowledgeHandler::new(context, retriever, top_k)),
    }
}

pub(crate) fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

pub(crate) fn require_customer(request: &HandlerRequest) -> Result<&CustomerId, HandlerError> {
    request.customer_id().ok_or(HandlerError::MissingIdentity)
}

pub(crate) fn llm_failure(error: anyhow::Error) -> HandlerError {
    HandlerError::Llm(format!("{error:#}"))
}

pub(crate) fn distribution_line(label: &str, counts: &std::collections::BTreeMap<String, i64>) -> String {
    if counts.is_empty() {
        return format!("{label}: none");
    }
    let parts = counts.iter().map(|(name, count)| format!("{name}: {count}")).collect::<Vec<_>>();
    format!("{label}: {}", parts.join(", "))
}

pub(crate) fn dashboard_headline(dashboard: &AdminDashboard) -> String {
    format!(
        "{} customers, {} registered in the last 30 days, {} open network incident(s).",
        dashboard.total_customers, dashboard.recent_registrations, dashboard.open_incidents
    )
}

use async_trait::async_trait;
use tera::Context;
use tracing::debug;

use teleassist_core::domain::account::BillingStatement;
use teleassist_core::errors::HandlerError;
use teleassist_core::ports::{Handler, HandlerRequest};

use super::{
    dashboard_headline, distribution_line, format_money, llm_failure, require_customer,
    HandlerContext,
};
use crate::llm::LlmRequest;
use crate::prompts::{BILLING_ANALYSIS, SYSTEM_BILLING};

pub const NO_BILLING_RECORDS: &str = "Could not find billing records for your account.";

/// Phrases that ask for the amount only and get the short deterministic answer.
pub const SIMPLE_BILLING_PHRASES: &[&str] = &[
    "what's my bill",
    "whats my bill",
    "how much",
    "bill amount",
    "what do i owe",
    "current bill",
    "this month",
];

const HISTORY_PERIODS: u32 = 6;

pub fn is_simple_billing_query(query: &str) -> bool {
    let lowered = query.to_lowercase().replace('\u{2019}', "'");
    SIMPLE_BILLING_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

pub struct BillingHandler {
    context: HandlerContext,
}

impl BillingHandler {
    pub fn new(context: HandlerContext) -> Self {
        Self { context }
    }

    async fn admin_overview(&self) -> Result<String, HandlerError> {
        let dashboard = self.context.store.lookup_admin_dashboard().await?;
        Ok([
            format!("Billing overview: {}", dashboard_headline(&dashboard)),
            distribution_line("Customers by plan", &dashboard.plan_distribution),
            distribution_line("Customers by account status", &dashboard.status_distribution),
            "Individual statements are only shown to the account owner.".to_string(),
        ]
        .join("\n"))
    }

    async fn detailed_analysis(
        &self,
        request: &HandlerRequest,
        statement: &BillingStatement,
    ) -> Result<String, HandlerError> {
        let history = self
            .context
            .store
            .usage_history(&statement.customer_id, HISTORY_PERIODS)
            .await?
            .into_iter()
            .filter(|record| record.billing_period_start != statement.usage.billing_period_start)
            .map(|record| {
                format!("{}: {}", record.period_label(), format_money(record.total_bill_amount))
            })
            .collect::<Vec<_>>();

        let facts = statement_facts(statement);
        let mut prompt_context = Context::new();
        prompt_context.insert("query", &request.query);
        prompt_context.insert("period", &statement.usage.period_label());
        prompt_context.insert("facts", &facts);
        prompt_context.insert("history", &history);
        let prompt = self.context.prompts.render(BILLING_ANALYSIS, &prompt_context)?;

        let reply = self
            .context
            .llm
            .complete(&LlmRequest::new(SYSTEM_BILLING, prompt, facts.clone()))
            .await
            .map_err(llm_failure)?;

        let required = vec![format_money(statement.usage.total_bill_amount)];
        Ok(self.context.grounding.apply(reply, &required, &facts))
    }
}

#[async_trait]
impl Handler for BillingHandler {
    fn name(&self) -> &'static str {
        "billing"
    }

    fn requires_identity(&self) -> bool {
        true
    }

    async fn handle(&self, request: &HandlerRequest) -> Result<String, HandlerError> {
        if request.is_admin_scope() {
            return self.admin_overview().await;
        }

        let customer_id = require_customer(request)?;
        let Some(statement) = self.context.store.latest_billing(customer_id).await? else {
            debug!(
                event_name = "billing.no_statement",
                correlation_id = %request.correlation_id,
                "no billing records for customer"
            );
            return Ok(NO_BILLING_RECORDS.to_string());
        };

        if is_simple_billing_query(&request.query) {
            return Ok(simple_answer(&statement));
        }
        self.detailed_analysis(request, &statement).await
    }
}

/// Total plus a base/extras breakdown, never more than five lines.
pub fn simple_answer(statement: &BillingStatement) -> String {
    let usage = &statement.usage;
    let extras = usage.additional_charges;
    let (plan_label, base) = match &statement.plan {
        Some(plan) => (plan.name.clone(), plan.monthly_cost),
        None => ("Plan charges".to_string(), usage.total_bill_amount - extras),
    };

    let mut lines = vec![
        format!(
            "Your current bill is {} for {}.",
            format_money(usage.total_bill_amount),
            usage.period_label()
        ),
        format!("{plan_label}: {}", format_money(base)),
    ];
    if extras.is_zero() {
        lines.push("No additional charges this period.".to_string());
    } else {
        lines.push(format!("Additional charges: {}", format_money(extras)));
    }
    lines.join("\n")
}

fn statement_facts(statement: &BillingStatement) -> String {
    let usage = &statement.usage;
    let plan = statement
        .plan
        .as_ref()
        .map(|plan| format!("{} ({}/month)", plan.name, format_money(plan.monthly_cost)))
        .unwrap_or_else(|| "none on record".to_string());

    [
        format!("Customer: {}", statement.customer_id.0),
        format!("Billing period: {}", usage.period_label()),
        format!("Plan: {plan}"),
        format!("Total bill: {}", format_money(usage.total_bill_amount)),
        format!("Additional charges: {}", format_money(usage.additional_charges)),
        format!(
            "Usage: {} GB data, {} minutes, {} SMS",
            usage.data_used_gb.normalize(),
            usage.voice_minutes_used,
            usage.sms_count_used
        ),
    ]
    .join("\n")
}

use async_trait::async_trait;
use tera::Context;

use teleassist_core::domain::account::{ServicePlan, UsageRecord};
use teleassist_core::errors::HandlerError;
use teleassist_core::ports::{Handler, HandlerRequest};

use super::{
    dashboard_headline, distribution_line, format_money, llm_failure, require_customer,
    HandlerContext,
};
use crate::llm::LlmRequest;
use crate::prompts::{PLAN_RECOMMENDATION, SYSTEM_PLAN};

pub struct PlanHandler {
    context: HandlerContext,
}

impl PlanHandler {
    pub fn new(context: HandlerContext) -> Self {
        Self { context }
    }

    async fn distribution_overview(&self) -> Result<String, HandlerError> {
        let dashboard = self.context.store.lookup_admin_dashboard().await?;
        Ok([
            format!("Plan overview: {}", dashboard_headline(&dashboard)),
            distribution_line("Customers by plan", &dashboard.plan_distribution),
        ]
        .join("\n"))
    }
}

#[async_trait]
impl Handler for PlanHandler {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn requires_identity(&self) -> bool {
        true
    }

    async fn handle(&self, request: &HandlerRequest) -> Result<String, HandlerError> {
        if request.is_admin_scope() {
            return self.distribution_overview().await;
        }

        let customer_id = require_customer(request)?;
        let store = &self.context.store;
        let current = store
            .lookup_customer_profile(customer_id)
            .await?
            .and_then(|profile| profile.plan);
        let latest = store.usage_history(customer_id, 1).await?.into_iter().next();
        let plans = store.available_plans().await?;
        if plans.is_empty() {
            return Err(HandlerError::NotFound("service plan catalogue".to_string()));
        }

        let recommended = latest.as_ref().and_then(|usage| recommend_plan(&plans, usage));
        let facts = recommendation_facts(current.as_ref(), latest.as_ref(), recommended);

        let mut prompt_context = Context::new();
        prompt_context.insert("query", &request.query);
        prompt_context.insert("facts", &facts);
        prompt_context.insert(
            "plans",
            &plans.iter().map(ServicePlan::summary_line).collect::<Vec<_>>(),
        );
        let prompt = self.context.prompts.render(PLAN_RECOMMENDATION, &prompt_context)?;

        let reply = self
            .context
            .llm
            .complete(&LlmRequest::new(SYSTEM_PLAN, prompt, facts.clone()))
            .await
            .map_err(llm_failure)?;

        let required = recommended.map(|plan| vec![plan.name.clone()]).unwrap_or_default();
        Ok(self.context.grounding.apply(reply, &required, &facts))
    }
}

pub fn covers_usage(plan: &ServicePlan, usage: &UsageRecord) -> bool {
    let data = plan.unlimited_data
        || plan.data_limit_gb.map_or(false, |limit| limit >= usage.data_used_gb);
    let voice = plan.unlimited_voice
        || plan.voice_minutes.map_or(false, |minutes| minutes >= usage.voice_minutes_used);
    let sms = plan.unlimited_sms || plan.sms_count.map_or(false, |count| count >= usage.sms_count_used);
    data && voice && sms
}

/// Cheapest plan whose allowances cover the usage record.
pub fn recommend_plan<'a>(plans: &'a [ServicePlan], usage: &UsageRecord) -> Option<&'a ServicePlan> {
    plans
        .iter()
        .filter(|plan| covers_usage(plan, usage))
        .min_by(|a, b| a.monthly_cost.cmp(&b.monthly_cost).then(a.plan_id.cmp(&b.plan_id)))
}

fn recommendation_facts(
    current: Option<&ServicePlan>,
    usage: Option<&UsageRecord>,
    recommended: Option<&ServicePlan>,
) -> String {
    let mut lines = vec![match current {
        Some(plan) => format!("Current plan: {} ({}/month)", plan.name, format_money(plan.monthly_cost)),
        None => "Current plan: none on record".to_string(),
    }];

    let Some(usage) = usage else {
        lines.push("No usage history on record, so no usage-based recommendation.".to_string());
        return lines.join("\n");
    };
    lines.push(format!(
        "Latest usage ({}): {} GB data, {} minutes, {} SMS",
        usage.period_label(),
        usage.data_used_gb.normalize(),
        usage.voice_minutes_used,
        usage.sms_count_used
    ));

    match (recommended, current) {
        (Some(best), Some(plan)) if best.plan_id == plan.plan_id => lines.push(format!(
            "Recommended plan: {}. Your current plan is already the lowest-cost plan that covers your usage.",
            best.name
        )),
        (Some(best), _) => lines.push(format!(
            "Recommended plan: {} ({}/month), the lowest-cost plan that covers your latest usage.",
            best.name,
            format_money(best.monthly_cost)
        )),
        (None, _) => {
            lines.push("No single plan covers your latest usage; consider the largest allowance.".to_string())
        }
    }
    lines.join("\n")
}

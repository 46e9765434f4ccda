use async_trait::async_trait;
use tera::Context;

use teleassist_core::domain::account::{
    AccountStatus, CustomerProfile, NetworkIncident, NetworkIssue,
};
use teleassist_core::errors::HandlerError;
use teleassist_core::ports::{Handler, HandlerRequest};

use super::{llm_failure, require_customer, HandlerContext};
use crate::llm::LlmRequest;
use crate::prompts::{NETWORK_DIAGNOSTICS, SYSTEM_NETWORK};
use crate::retrieval::terms;

pub struct NetworkHandler {
    context: HandlerContext,
}

impl NetworkHandler {
    pub fn new(context: HandlerContext) -> Self {
        Self { context }
    }

    async fn operations_overview(&self) -> Result<String, HandlerError> {
        let incidents = self.context.store.open_network_incidents().await?;
        if incidents.is_empty() {
            return Ok("Network operations overview: no open network incidents.".to_string());
        }

        let mut lines =
            vec![format!("Network operations overview: {} open incident(s).", incidents.len())];
        lines.extend(incidents.iter().map(|incident| format!("- {}", incident_line(incident))));
        Ok(lines.join("\n"))
    }

    async fn diagnose(
        &self,
        request: &HandlerRequest,
        profile: &CustomerProfile,
    ) -> Result<String, HandlerError> {
        let issues = self.context.store.common_network_issues().await?;
        let incidents = self.context.store.open_network_incidents().await?;
        let facts = diagnostics_facts(profile, &matching_issues(&request.query, &issues), &incidents);

        let mut prompt_context = Context::new();
        prompt_context.insert("query", &request.query);
        prompt_context.insert("status", profile.status.label());
        prompt_context.insert("facts", &facts);
        let prompt = self.context.prompts.render(NETWORK_DIAGNOSTICS, &prompt_context)?;

        let reply = self
            .context
            .llm
            .complete(&LlmRequest::new(SYSTEM_NETWORK, prompt, facts.clone()))
            .await
            .map_err(llm_failure)?;
        Ok(self.context.grounding.apply(reply, &[], &facts))
    }
}

#[async_trait]
impl Handler for NetworkHandler {
    fn name(&self) -> &'static str {
        "network"
    }

    fn requires_identity(&self) -> bool {
        true
    }

    async fn handle(&self, request: &HandlerRequest) -> Result<String, HandlerError> {
        if request.is_admin_scope() {
            return self.operations_overview().await;
        }

        let customer_id = require_customer(request)?;
        let profile = self
            .context
            .store
            .lookup_customer_profile(customer_id)
            .await?
            .ok_or_else(|| HandlerError::NotFound(format!("customer profile {}", customer_id.0)))?;

        // Account status is checked before any network diagnostics.
        if profile.status.blocks_service() {
            return Ok(blocked_service_answer(&profile));
        }
        self.diagnose(request, &profile).await
    }
}

/// Root-cause answer for accounts whose service is switched off administratively.
pub fn blocked_service_answer(profile: &CustomerProfile) -> String {
    let cause = match &profile.status {
        AccountStatus::Cancelled => "has been cancelled",
        _ => "is currently suspended",
    };
    [
        format!(
            "Your account ({}) {cause}, which is why calls, texts and data are not working. \
             This is not a network fault.",
            profile.customer_id.0
        ),
        "To restore service, contact billing or customer service to reactivate your account. \
         Service resumes as soon as the account is active again."
            .to_string(),
    ]
    .join("\n")
}

/// Issues sharing a term with the query; all issues when nothing matches.
fn matching_issues<'a>(query: &str, issues: &'a [NetworkIssue]) -> Vec<&'a NetworkIssue> {
    let query_terms = terms(query);
    let matched = issues
        .iter()
        .filter(|issue| {
            let issue_terms = terms(&format!("{} {}", issue.issue_type, issue.symptoms));
            !query_terms.is_disjoint(&issue_terms)
        })
        .collect::<Vec<_>>();
    if matched.is_empty() {
        issues.iter().collect()
    } else {
        matched
    }
}

fn incident_line(incident: &NetworkIncident) -> String {
    format!(
        "{}: {} in {} ({} severity, {})",
        incident.incident_id, incident.issue_type, incident.area, incident.severity, incident.status
    )
}

fn diagnostics_facts(
    profile: &CustomerProfile,
    issues: &[&NetworkIssue],
    incidents: &[NetworkIncident],
) -> String {
    let mut lines = vec![
        format!("Account status: {}", profile.status.label()),
        format!(
            "Plan: {}",
            profile.plan.as_ref().map(|plan| plan.name.as_str()).unwrap_or("none on record")
        ),
    ];
    lines.extend(issues.iter().map(|issue| {
        format!(
            "Known issue: {}. Symptoms: {}. Fix: {}",
            issue.issue_type, issue.symptoms, issue.solution
        )
    }));
    if incidents.is_empty() {
        lines.push("No open network incidents.".to_string());
    } else {
        lines.extend(incidents.iter().map(|incident| format!("Open incident {}", incident_line(incident))));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use teleassist_core::errors::HandlerError;
    use teleassist_core::ports::Handler;

    use super::NetworkHandler;
    use crate::handlers::testing::{admin_request, context, customer_request, store};
    use crate::llm::{FailingLlmClient, OfflineLlmClient, StaticLlmClient};

    #[tokio::test]
    async fn suspended_account_is_the_root_cause() {
        let llm = Arc::new(FailingLlmClient::default());
        let handler = NetworkHandler::new(context(store().await, llm.clone()));
        let answer = handler
            .handle(&customer_request("CUST003", "My internet is slow"))
            .await
            .expect("network answer");

        assert!(answer.contains("suspended"), "{answer}");
        assert!(answer.contains("reactivate"));
        assert!(!answer.contains("Known issue"), "no generic troubleshooting: {answer}");
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn active_account_gets_matching_diagnostics() {
        let handler = NetworkHandler::new(context(store().await, Arc::new(OfflineLlmClient)));
        let answer = handler
            .handle(&customer_request("CUST002", "My internet is slow"))
            .await
            .expect("network answer");

        assert!(answer.contains("Account status: Active"), "{answer}");
        assert!(answer.contains("Known issue: Slow Data"));
        assert!(!answer.contains("Call Drops"), "only matching issues: {answer}");
        assert!(answer.contains("INC-1"));
    }

    #[tokio::test]
    async fn model_sees_the_account_status() {
        let llm = Arc::new(StaticLlmClient::new("Restart your phone."));
        let handler = NetworkHandler::new(context(store().await, llm.clone()));
        let answer = handler
            .handle(&customer_request("CUST002", "no signal at home"))
            .await
            .expect("network answer");
        assert_eq!(answer, "Restart your phone.");
        assert!(llm.requests()[0].prompt.contains("account is Active"));
    }

    #[tokio::test]
    async fn admin_gets_incident_overview() {
        let handler = NetworkHandler::new(context(store().await, Arc::new(OfflineLlmClient)));
        let answer = handler.handle(&admin_request("network status")).await.expect("overview");
        assert!(answer.starts_with("Network operations overview: 1 open incident(s)."), "{answer}");
    }

    #[tokio::test]
    async fn unknown_customer_profile_is_not_found() {
        let handler = NetworkHandler::new(context(store().await, Arc::new(OfflineLlmClient)));
        let result = handler.handle(&customer_request("CUST404", "no signal")).await;
        assert!(matches!(result, Err(HandlerError::NotFound(_))));
    }
}

use tera::{Context, Tera};

use teleassist_core::errors::HandlerError;

pub const BILLING_ANALYSIS: &str = "billing_analysis.tera";
pub const NETWORK_DIAGNOSTICS: &str = "network_diagnostics.tera";
pub const PLAN_RECOMMENDATION: &str = "plan_recommendation.tera";
pub const KNOWLEDGE_ANSWER: &str = "knowledge_answer.tera";

pub const SYSTEM_BILLING: &str = "You are a telecom billing specialist. Answer in plain language \
    and match the depth of the question. Amounts come from the account facts you are given; \
    never change or invent them.";
pub const SYSTEM_NETWORK: &str = "You are a telecom network diagnostics specialist. Give \
    concise, numbered troubleshooting steps.";
pub const SYSTEM_PLAN: &str = "You are a telecom service plan advisor. Recommend plans only \
    from the catalogue you are given.";
pub const SYSTEM_KNOWLEDGE: &str = "You answer questions about telecom services using only the \
    documentation excerpts you are given.";

/// Prompt templates compiled into the binary.
#[derive(Clone, Debug)]
pub struct PromptRenderer {
    tera: Tera,
}

impl PromptRenderer {
    pub fn embedded() -> Result<Self, HandlerError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (BILLING_ANALYSIS, include_str!("../../../templates/prompts/billing_analysis.tera")),
            (
                NETWORK_DIAGNOSTICS,
                include_str!("../../../templates/prompts/network_diagnostics.tera"),
            ),
            (
                PLAN_RECOMMENDATION,
                include_str!("../../../templates/prompts/plan_recommendation.tera"),
            ),
            (KNOWLEDGE_ANSWER, include_str!("../../../templates/prompts/knowledge_answer.tera")),
        ])
        .map_err(|e| HandlerError::Template(e.to_string()))?;

        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &Context) -> Result<String, HandlerError> {
        self.tera
            .render(template, context)
            .map_err(|e| HandlerError::Template(format!("{template}: {e}")))
    }
}

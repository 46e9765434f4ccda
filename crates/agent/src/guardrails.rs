use tracing::warn;

/// Outcome of checking a model reply against the facts it had to carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroundingDecision {
    Allow,
    Degrade { reason_code: &'static str, missing: Vec<String> },
}

/// Amounts, plan names and account status are decided by the handlers. The model only
/// phrases them, so a reply that drops one of them gets the facts block attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroundingPolicy {
    pub append_missing_facts: bool,
}

impl Default for GroundingPolicy {
    fn default() -> Self {
        Self { append_missing_facts: true }
    }
}

impl GroundingPolicy {
    pub fn evaluate(&self, reply: &str, required: &[String]) -> GroundingDecision {
        if reply.trim().is_empty() {
            return GroundingDecision::Degrade {
                reason_code: "empty_reply",
                missing: required.to_vec(),
            };
        }

        let missing = required
            .iter()
            .filter(|fact| !reply.contains(fact.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        if missing.is_empty() {
            GroundingDecision::Allow
        } else {
            GroundingDecision::Degrade { reason_code: "missing_facts", missing }
        }
    }

    pub fn apply(&self, reply: String, required: &[String], facts: &str) -> String {
        match self.evaluate(&reply, required) {
            GroundingDecision::Allow => reply,
            GroundingDecision::Degrade { reason_code: "empty_reply", .. } => facts.to_string(),
            GroundingDecision::Degrade { reason_code, missing } => {
                warn!(
                    event_name = "agent.grounding_degraded",
                    reason_code,
                    missing = missing.len(),
                    "model reply dropped required facts"
                );
                if self.append_missing_facts {
                    format!("{}\n\nAccount facts:\n{}", reply.trim_end(), facts)
                } else {
                    facts.to_string()
                }
            }
        }
    }
}

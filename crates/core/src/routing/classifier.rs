use serde::Serialize;

use crate::domain::intent::Intent;

/// One keyword-membership rule. Rules are evaluated by ascending `priority`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntentRule {
    pub intent: Intent,
    pub priority: u8,
    pub keywords: &'static [&'static str],
}

impl IntentRule {
    fn matches(&self, lowered_query: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered_query.contains(keyword))
    }
}

/// Billing is checked before network, so "data bill" is a billing query.
pub const DEFAULT_RULES: [IntentRule; 3] = [
    IntentRule { intent: Intent::Billing, priority: 1, keywords: &["bill", "charge", "payment"] },
    IntentRule {
        intent: Intent::Network,
        priority: 2,
        keywords: &["network", "signal", "data", "call", "internet", "slow"],
    },
    IntentRule {
        intent: Intent::Plan,
        priority: 3,
        keywords: &["plan", "recommend", "upgrade", "downgrade"],
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ClassificationSource {
    ChannelHint,
    Rule { priority: u8 },
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    pub source: ClassificationSource,
}

#[derive(Clone, Debug)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl IntentClassifier {
    pub fn new(mut rules: Vec<IntentRule>) -> Self {
        // Stable sort keeps declaration order for equal priorities.
        rules.sort_by_key(|rule| rule.priority);
        Self { rules }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    pub fn classify(&self, query: &str, channel_hint: Option<&str>) -> Classification {
        if let Some(intent) = channel_hint.and_then(Intent::from_channel_hint) {
            return Classification { intent, source: ClassificationSource::ChannelHint };
        }

        let lowered = query.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| Classification {
                intent: rule.intent,
                source: ClassificationSource::Rule { priority: rule.priority },
            })
            .unwrap_or(Classification {
                intent: Intent::Knowledge,
                source: ClassificationSource::Fallback,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{ClassificationSource, IntentClassifier, IntentRule, DEFAULT_RULES};
    use crate::domain::intent::Intent;

    fn classify(query: &str) -> Intent {
        IntentClassifier::default().classify(query, None).intent
    }

    #[test]
    fn each_vocabulary_maps_to_its_intent() {
        assert_eq!(classify("Why was I charged twice?"), Intent::Billing);
        assert_eq!(classify("My internet is slow"), Intent::Network);
        assert_eq!(classify("Can you recommend something cheaper?"), Intent::Plan);
    }

    #[test]
    fn billing_wins_over_network_when_both_match() {
        let classification =
            IntentClassifier::default().classify("Why is my data bill so high?", None);
        assert_eq!(classification.intent, Intent::Billing);
        assert_eq!(classification.source, ClassificationSource::Rule { priority: 1 });
    }

    #[test]
    fn network_wins_over_plan_when_both_match() {
        assert_eq!(classify("Should I upgrade because my signal drops?"), Intent::Network);
    }

    #[test]
    fn unmatched_queries_fall_back_to_knowledge() {
        let classification = IntentClassifier::default().classify("What is 5G?", None);
        assert_eq!(classification.intent, Intent::Knowledge);
        assert_eq!(classification.source, ClassificationSource::Fallback);
        assert_eq!(classify(""), Intent::Knowledge);
    }

    #[test]
    fn channel_hint_overrides_text() {
        let classification =
            IntentClassifier::default().classify("What's my bill this month?", Some("network"));
        assert_eq!(classification.intent, Intent::Network);
        assert_eq!(classification.source, ClassificationSource::ChannelHint);
    }

    #[test]
    fn unknown_hint_is_ignored() {
        let classification =
            IntentClassifier::default().classify("What's my bill?", Some("weather"));
        assert_eq!(classification.intent, Intent::Billing);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify("PAYMENT failed"), Intent::Billing);
    }

    #[test]
    fn rule_order_is_by_priority_not_declaration() {
        let mut reversed = DEFAULT_RULES.to_vec();
        reversed.reverse();
        let classifier = IntentClassifier::new(reversed);
        let priorities: Vec<u8> = classifier.rules().iter().map(|rule| rule.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
        assert_eq!(classifier.classify("data bill", None).intent, Intent::Billing);
    }

    #[test]
    fn custom_rules_are_supported() {
        let classifier = IntentClassifier::new(vec![IntentRule {
            intent: Intent::Plan,
            priority: 1,
            keywords: &["roaming"],
        }]);
        assert_eq!(classifier.classify("roaming abroad", None).intent, Intent::Plan);
        assert_eq!(classifier.classify("my bill", None).intent, Intent::Knowledge);
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = IntentClassifier::default();
        let first = classifier.classify("slow data and a payment question", None);
        for _ in 0..10 {
            assert_eq!(classifier.classify("slow data and a payment question", None), first);
        }
    }
}

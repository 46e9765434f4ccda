use serde::Serialize;

use crate::errors::RoutingError;

/// Handler outputs in insertion order. Iteration order is part of the contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Responses {
    entries: Vec<(String, String)>,
}

impl Responses {
    /// Re-inserting a handler replaces its text but keeps its original position.
    pub fn insert(&mut self, handler: impl Into<String>, text: impl Into<String>) {
        let handler = handler.into();
        let text = text.into();
        match self.entries.iter_mut().find(|(name, _)| *name == handler) {
            Some(entry) => entry.1 = text,
            None => self.entries.push((handler, text)),
        }
    }

    pub fn get(&self, handler: &str) -> Option<&str> {
        self.entries.iter().find(|(name, _)| name == handler).map(|(_, text)| text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, text)| (name.as_str(), text.as_str()))
    }
}

/// Picks the first-inserted response. An empty set yields the generic apology.
pub fn reduce(responses: &Responses) -> String {
    responses
        .iter()
        .next()
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| fallback_message().to_string())
}

fn fallback_message() -> &'static str {
    RoutingError::HandlerFailure { handler: "none", detail: String::new() }.user_message()
}

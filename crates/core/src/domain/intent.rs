use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Billing,
    Network,
    Plan,
    Knowledge,
}

impl Intent {
    pub const ALL: [Intent; 4] = [Self::Billing, Self::Network, Self::Plan, Self::Knowledge];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Billing => "billing",
            Self::Network => "network",
            Self::Plan => "plan",
            Self::Knowledge => "knowledge",
        }
    }

    /// Maps a free-form label to an intent. Unrecognised labels fall back to `Knowledge`.
    pub fn from_label(label: &str) -> Self {
        Self::from_channel_hint(label).unwrap_or(Self::Knowledge)
    }

    /// Parses a UI channel hint. Returns `None` for unknown or empty hints so the
    /// classifier can fall through to keyword rules.
    pub fn from_channel_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "billing" | "bill" | "bills" => Some(Self::Billing),
            "network" | "network_troubleshooting" | "troubleshooting" => Some(Self::Network),
            "plan" | "plans" | "service_plan" | "recommendation" => Some(Self::Plan),
            "knowledge" | "knowledge_base" | "docs" => Some(Self::Knowledge),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

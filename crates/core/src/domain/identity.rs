use serde::{Deserialize, Serialize};

use super::account::{AdminDashboard, CustomerProfile};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Customer,
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a stored role label. Anything the store does not recognise is `Unknown`.
    pub fn from_store_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "admin" => Self::Admin,
            "customer" => Self::Customer,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Data-access scope attached to a resolved caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum SubjectId {
    Customer(CustomerId),
    AdminScope,
}

impl SubjectId {
    pub const ADMIN_SENTINEL: &'static str = "ADMIN";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Customer(id) => id.as_str(),
            Self::AdminScope => Self::ADMIN_SENTINEL,
        }
    }

    pub fn customer_id(&self) -> Option<&CustomerId> {
        match self {
            Self::Customer(id) => Some(id),
            Self::AdminScope => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnonymousReason {
    NoEmail,
    NotFound,
    ProfileMissing,
    ProfileMismatch,
    LookupFailed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityProfile {
    Customer(CustomerProfile),
    AdminDashboard(AdminDashboard),
    Anonymous { reason: AnonymousReason },
}

/// The output of identity resolution, consumed by every downstream stage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Identity {
    pub email: Option<String>,
    pub role: Role,
    pub subject_id: Option<SubjectId>,
    pub profile: IdentityProfile,
}

impl Identity {
    pub fn anonymous(email: Option<String>, reason: AnonymousReason) -> Self {
        Self {
            email,
            role: Role::Unknown,
            subject_id: None,
            profile: IdentityProfile::Anonymous { reason },
        }
    }

    pub fn admin(email: String, dashboard: AdminDashboard) -> Self {
        Self {
            email: Some(email),
            role: Role::Admin,
            subject_id: Some(SubjectId::AdminScope),
            profile: IdentityProfile::AdminDashboard(dashboard),
        }
    }

    pub fn customer(email: String, profile: CustomerProfile) -> Self {
        Self {
            email: Some(email),
            role: Role::Customer,
            subject_id: Some(SubjectId::Customer(profile.customer_id.clone())),
            profile: IdentityProfile::Customer(profile),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role != Role::Unknown && self.subject_id.is_some()
    }

    pub fn actor_label(&self) -> String {
        self.email.as_deref().map(redact_email).unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Lower-cases and trims an email; empty input yields `None`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

/// Keeps the first character of the local part and the full domain: `j***@email.com`.
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

use crate::domain::identity::{Role, SubjectId};
use crate::errors::RoutingError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny { error: RoutingError, user_message: String, fallback_path: &'static str },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::Deny { error, .. } => Some(error.reason_code()),
        }
    }
}

/// What the dispatcher knows when deciding whether a handler may run.
#[derive(Clone, Copy, Debug)]
pub struct AccessRequest<'a> {
    pub handler: &'static str,
    pub requires_identity: bool,
    pub role: Role,
    pub subject_id: Option<&'a SubjectId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Lets admins reach identity-requiring handlers in aggregate scope.
    pub allow_admin_aggregate: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self { allow_admin_aggregate: true }
    }
}

impl AccessPolicy {
    pub fn evaluate(&self, request: &AccessRequest<'_>) -> AccessDecision {
        if !request.requires_identity {
            return AccessDecision::Allow;
        }

        match (request.role, request.subject_id) {
            (Role::Unknown, _) | (_, None) => deny(RoutingError::IdentityNotFound, "login"),
            (Role::Customer, Some(SubjectId::Customer(_))) => AccessDecision::Allow,
            (Role::Admin, Some(SubjectId::AdminScope)) if self.allow_admin_aggregate => {
                AccessDecision::Allow
            }
            (Role::Admin, Some(SubjectId::AdminScope)) => deny(
                RoutingError::AccessDenied {
                    handler: request.handler,
                    reason: "admin aggregate access disabled".to_string(),
                },
                "admin_console",
            ),
            // A customer role carrying the admin scope, or an admin carrying a customer id.
            (role, Some(_)) => deny(
                RoutingError::AccessDenied {
                    handler: request.handler,
                    reason: format!("subject scope does not match role {}", role.as_str()),
                },
                "login",
            ),
        }
    }
}

fn deny(error: RoutingError, fallback_path: &'static str) -> AccessDecision {
    let user_message = error.user_message().to_string();
    AccessDecision::Deny { error, user_message, fallback_path }
}

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::identity::{normalize_email, redact_email, AnonymousReason, Identity, Role};
use crate::errors::StoreError;
use crate::ports::IdentityStore;

/// Resolves a caller email into role, subject scope and profile. Lookup failures fail
/// closed to `Role::Unknown`; there is no default customer.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, caller_email: Option<&str>) -> Identity {
        let Some(email) = caller_email.and_then(normalize_email) else {
            return Identity::anonymous(None, AnonymousReason::NoEmail);
        };

        match self.resolve_email(&email).await {
            Ok(identity) => identity,
            Err(error) => {
                warn!(
                    event_name = "identity.lookup_failed",
                    caller = %redact_email(&email),
                    error = %error,
                    "identity lookup failed; treating caller as unknown"
                );
                Identity::anonymous(Some(email), AnonymousReason::LookupFailed)
            }
        }
    }

    async fn resolve_email(&self, email: &str) -> Result<Identity, StoreError> {
        let role = self.store.lookup_role(email).await?.unwrap_or(Role::Unknown);
        debug!(
            event_name = "identity.role_looked_up",
            caller = %redact_email(email),
            role = role.as_str(),
            "role lookup complete"
        );

        match role {
            Role::Unknown => Ok(Identity::anonymous(Some(email.to_string()), AnonymousReason::NotFound)),
            Role::Admin => {
                let dashboard = self.store.lookup_admin_dashboard().await?;
                Ok(Identity::admin(email.to_string(), dashboard))
            }
            Role::Customer => {
                let Some(customer_id) = self.store.lookup_customer_id(email).await? else {
                    return Ok(Identity::anonymous(
                        Some(email.to_string()),
                        AnonymousReason::ProfileMissing,
                    ));
                };
                let Some(profile) = self.store.lookup_customer_profile(&customer_id).await? else {
                    return Ok(Identity::anonymous(
                        Some(email.to_string()),
                        AnonymousReason::ProfileMissing,
                    ));
                };

                let profile_email = normalize_email(&profile.email);
                if profile.customer_id != customer_id || profile_email.as_deref() != Some(email) {
                    warn!(
                        event_name = "identity.profile_mismatch",
                        caller = %redact_email(email),
                        "customer profile does not belong to caller"
                    );
                    return Ok(Identity::anonymous(
                        Some(email.to_string()),
                        AnonymousReason::ProfileMismatch,
                    ));
                }

                Ok(Identity::customer(email.to_string(), profile))
            }
        }
    }
}

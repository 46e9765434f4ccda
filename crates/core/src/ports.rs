use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::account::{
    AdminDashboard, BillingStatement, CustomerProfile, NetworkIncident, NetworkIssue, ServicePlan,
    UsageRecord,
};
use crate::domain::identity::{CustomerId, Role, SubjectId};
use crate::domain::intent::Intent;
use crate::errors::{HandlerError, StoreError};

/// Read-only identity lookups used by the resolver.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn lookup_role(&self, email: &str) -> Result<Option<Role>, StoreError>;
    async fn lookup_customer_id(&self, email: &str) -> Result<Option<CustomerId>, StoreError>;
    async fn lookup_customer_profile(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, StoreError>;
    async fn lookup_admin_dashboard(&self) -> Result<AdminDashboard, StoreError>;
}

/// Read-only account data consumed by the handlers. Every per-customer query is keyed by
/// the resolved `CustomerId`, never by a caller-supplied value.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn latest_billing(&self, id: &CustomerId)
        -> Result<Option<BillingStatement>, StoreError>;
    async fn usage_history(
        &self,
        id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<UsageRecord>, StoreError>;
    async fn available_plans(&self) -> Result<Vec<ServicePlan>, StoreError>;
    async fn common_network_issues(&self) -> Result<Vec<NetworkIssue>, StoreError>;
    async fn open_network_incidents(&self) -> Result<Vec<NetworkIncident>, StoreError>;
}

pub trait CustomerStore: IdentityStore + AccountStore {}

impl<T> CustomerStore for T where T: IdentityStore + AccountStore {}

/// Input handed to a handler. `subject_id` is always the resolver's output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerRequest {
    pub correlation_id: String,
    pub query: String,
    pub role: Role,
    pub subject_id: Option<SubjectId>,
}

impl HandlerRequest {
    pub fn customer_id(&self) -> Option<&CustomerId> {
        self.subject_id.as_ref().and_then(SubjectId::customer_id)
    }

    pub fn is_admin_scope(&self) -> bool {
        self.role == Role::Admin && self.subject_id == Some(SubjectId::AdminScope)
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the dispatcher must deny callers without a resolved identity.
    fn requires_identity(&self) -> bool;

    async fn handle(&self, request: &HandlerRequest) -> Result<String, HandlerError>;
}

/// Fixed intent to handler mapping. Every intent has exactly one handler.
#[derive(Clone)]
pub struct HandlerSet {
    pub billing: Arc<dyn Handler>,
    pub network: Arc<dyn Handler>,
    pub plan: Arc<dyn Handler>,
    pub knowledge: Arc<dyn Handler>,
}

impl HandlerSet {
    pub fn for_intent(&self, intent: Intent) -> &Arc<dyn Handler> {
        match intent {
            Intent::Billing => &self.billing,
            Intent::Network => &self.network,
            Intent::Plan => &self.plan,
            Intent::Knowledge => &self.knowledge,
        }
    }

    /// Resolves a free-form label. Unmapped labels use the knowledge handler.
    pub fn for_label(&self, label: &str) -> &Arc<dyn Handler> {
        self.for_intent(Intent::from_label(label))
    }
}

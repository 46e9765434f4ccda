pub mod access;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod routing;

pub use access::{AccessDecision, AccessPolicy, AccessRequest};
pub use domain::account::{
    AccountStatus, AdminDashboard, BillingStatement, CustomerProfile, NetworkIncident,
    NetworkIssue, ServicePlan, UsageRecord,
};
pub use domain::identity::{
    AnonymousReason, CustomerId, Identity, IdentityProfile, Role, SubjectId,
};
pub use domain::intent::Intent;
pub use errors::{
    ApplicationError, DomainError, HandlerError, InterfaceError, RoutingError, StoreError,
};
pub use ports::{AccountStore, CustomerStore, Handler, HandlerRequest, HandlerSet, IdentityStore};
pub use routing::{Answer, IntentClassifier, Orchestrator, QueryRequest, RoutingState};

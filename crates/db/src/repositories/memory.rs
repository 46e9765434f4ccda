use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use teleassist_core::domain::account::{
    AdminDashboard, BillingStatement, CustomerProfile, NetworkIncident, NetworkIssue, ServicePlan,
    UsageRecord,
};
use teleassist_core::domain::identity::{CustomerId, Role};
use teleassist_core::errors::StoreError;
use teleassist_core::ports::{AccountStore, IdentityStore};

use super::customer::RECENT_REGISTRATION_DAYS;
use super::normalized_email;

/// Map-backed store for tests and offline demos. `set_unavailable(true)` makes every lookup
/// fail the way a dropped database connection would.
#[derive(Default)]
pub struct InMemoryCustomerStore {
    roles: RwLock<HashMap<String, Role>>,
    customers: RwLock<HashMap<CustomerId, CustomerProfile>>,
    usage: RwLock<HashMap<CustomerId, Vec<UsageRecord>>>,
    plans: RwLock<Vec<ServicePlan>>,
    issues: RwLock<Vec<NetworkIssue>>,
    incidents: RwLock<Vec<NetworkIncident>>,
    unavailable: AtomicBool,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn insert_user(&self, email: &str, role: Role) {
        self.roles.write().await.insert(normalized_email(email), role);
    }

    /// Registers the profile and a matching customer login.
    pub async fn insert_customer(&self, profile: CustomerProfile) {
        self.roles.write().await.insert(normalized_email(&profile.email), Role::Customer);
        self.customers.write().await.insert(profile.customer_id.clone(), profile);
    }

    pub async fn insert_usage(&self, id: &CustomerId, record: UsageRecord) {
        let mut usage = self.usage.write().await;
        let records = usage.entry(id.clone()).or_default();
        records.push(record);
        records.sort_by(|a, b| b.billing_period_start.cmp(&a.billing_period_start));
    }

    pub async fn insert_plan(&self, plan: ServicePlan) {
        let mut plans = self.plans.write().await;
        plans.retain(|existing| existing.plan_id != plan.plan_id);
        plans.push(plan);
        plans.sort_by_key(|plan| plan.plan_id);
    }

    pub async fn insert_issue(&self, issue: NetworkIssue) {
        self.issues.write().await.push(issue);
    }

    pub async fn insert_incident(&self, incident: NetworkIncident) {
        self.incidents.write().await.push(incident);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }
}

fn is_open(incident: &NetworkIncident) -> bool {
    !incident.status.eq_ignore_ascii_case("resolved")
}

#[async_trait]
impl IdentityStore for InMemoryCustomerStore {
    async fn lookup_role(&self, email: &str) -> Result<Option<Role>, StoreError> {
        self.check_available()?;
        Ok(self.roles.read().await.get(&normalized_email(email)).copied())
    }

    async fn lookup_customer_id(&self, email: &str) -> Result<Option<CustomerId>, StoreError> {
        self.check_available()?;
        let email = normalized_email(email);
        let customers = self.customers.read().await;
        Ok(customers
            .values()
            .find(|profile| normalized_email(&profile.email) == email)
            .map(|profile| profile.customer_id.clone()))
    }

    async fn lookup_customer_profile(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, StoreError> {
        self.check_available()?;
        Ok(self.customers.read().await.get(id).cloned())
    }

    async fn lookup_admin_dashboard(&self) -> Result<AdminDashboard, StoreError> {
        self.check_available()?;
        let customers = self.customers.read().await;

        let cutoff = Utc::now().date_naive() - Duration::days(RECENT_REGISTRATION_DAYS);
        let mut recent_registrations = 0;
        let mut plan_distribution = BTreeMap::new();
        let mut status_distribution = BTreeMap::new();
        for profile in customers.values() {
            if profile.registration_date.is_some_and(|date| date >= cutoff) {
                recent_registrations += 1;
            }
            let plan = profile
                .plan
                .as_ref()
                .map(|plan| plan.name.clone())
                .unwrap_or_else(|| "No plan".to_string());
            *plan_distribution.entry(plan).or_insert(0) += 1;
            *status_distribution.entry(profile.status.label().to_string()).or_insert(0) += 1;
        }

        let open_incidents =
            self.incidents.read().await.iter().filter(|incident| is_open(incident)).count();

        Ok(AdminDashboard {
            total_customers: customers.len() as i64,
            recent_registrations,
            plan_distribution,
            status_distribution,
            open_incidents: open_incidents as i64,
        })
    }
}

#[async_trait]
impl AccountStore for InMemoryCustomerStore {
    async fn latest_billing(
        &self,
        id: &CustomerId,
    ) -> Result<Option<BillingStatement>, StoreError> {
        self.check_available()?;
        let Some(latest) = self.usage.read().await.get(id).and_then(|records| records.first().cloned())
        else {
            return Ok(None);
        };
        let plan = self.customers.read().await.get(id).and_then(|profile| profile.plan.clone());
        Ok(Some(BillingStatement { customer_id: id.clone(), usage: latest, plan }))
    }

    async fn usage_history(
        &self,
        id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<UsageRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .usage
            .read()
            .await
            .get(id)
            .map(|records| records.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn available_plans(&self) -> Result<Vec<ServicePlan>, StoreError> {
        self.check_available()?;
        Ok(self.plans.read().await.clone())
    }

    async fn common_network_issues(&self) -> Result<Vec<NetworkIssue>, StoreError> {
        self.check_available()?;
        Ok(self.issues.read().await.clone())
    }

    async fn open_network_incidents(&self) -> Result<Vec<NetworkIncident>, StoreError> {
        self.check_available()?;
        Ok(self.incidents.read().await.iter().filter(|incident| is_open(incident)).cloned().collect())
    }
}

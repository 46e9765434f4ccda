use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use teleassist_core::domain::account::{
    AccountStatus, AdminDashboard, CustomerProfile, ServicePlan,
};
use teleassist_core::domain::identity::{CustomerId, Role};
use teleassist_core::errors::StoreError;
use teleassist_core::ports::IdentityStore;

use super::{column, normalized_email, parse_date, parse_decimal, RepositoryError};
use crate::DbPool;

/// Days counted as "recent" on the admin dashboard.
pub const RECENT_REGISTRATION_DAYS: i64 = 30;

pub(crate) const PROFILE_SELECT: &str = "SELECT c.customer_id, c.name, c.email, c.phone_number, \
     c.address, c.account_status, c.registration_date, \
     p.plan_id, p.name AS plan_name, p.plan_type, p.monthly_cost, p.data_limit_gb, \
     p.voice_minutes, p.sms_count, p.unlimited_data, p.unlimited_voice, p.unlimited_sms, \
     p.features \
     FROM customers c LEFT JOIN service_plans p ON p.plan_id = c.service_plan_id";

/// SQLite-backed store for identity and account lookups.
#[derive(Clone)]
pub struct SqlCustomerStore {
    pool: DbPool,
}

impl SqlCustomerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn find_role(&self, email: &str) -> Result<Option<Role>, RepositoryError> {
        let label: Option<String> = sqlx::query_scalar(
            "SELECT role FROM users WHERE LOWER(TRIM(email)) = ?1 AND is_active = 1",
        )
        .bind(normalized_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(label.map(|label| Role::from_store_label(&label)))
    }

    pub async fn find_customer_id(
        &self,
        email: &str,
    ) -> Result<Option<CustomerId>, RepositoryError> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT customer_id FROM customers WHERE LOWER(TRIM(email)) = ?1")
                .bind(normalized_email(email))
                .fetch_optional(&self.pool)
                .await?;

        Ok(id.map(CustomerId))
    }

    pub async fn find_profile(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row = sqlx::query(&format!("{PROFILE_SELECT} WHERE c.customer_id = ?1"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    pub async fn dashboard(&self) -> Result<AdminDashboard, RepositoryError> {
        let total_customers: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM customers").fetch_one(&self.pool).await?;

        let recent_registrations: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM customers WHERE registration_date >= date('now', ?1)",
        )
        .bind(format!("-{RECENT_REGISTRATION_DAYS} days"))
        .fetch_one(&self.pool)
        .await?;

        let plan_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT COALESCE(p.name, 'No plan') AS plan_name, COUNT(1) AS customers \
             FROM customers c LEFT JOIN service_plans p ON p.plan_id = c.service_plan_id \
             GROUP BY plan_name",
        )
        .fetch_all(&self.pool)
        .await?;

        let status_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT account_status, COUNT(1) FROM customers GROUP BY account_status",
        )
        .fetch_all(&self.pool)
        .await?;

        let open_incidents: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM network_incidents WHERE LOWER(status) <> 'resolved'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminDashboard {
            total_customers,
            recent_registrations,
            plan_distribution: plan_rows.into_iter().collect::<BTreeMap<_, _>>(),
            status_distribution: status_rows.into_iter().collect::<BTreeMap<_, _>>(),
            open_incidents,
        })
    }
}

#[async_trait]
impl IdentityStore for SqlCustomerStore {
    async fn lookup_role(&self, email: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.find_role(email).await?)
    }

    async fn lookup_customer_id(&self, email: &str) -> Result<Option<CustomerId>, StoreError> {
        Ok(self.find_customer_id(email).await?)
    }

    async fn lookup_customer_profile(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, StoreError> {
        Ok(self.find_profile(id).await?)
    }

    async fn lookup_admin_dashboard(&self) -> Result<AdminDashboard, StoreError> {
        Ok(self.dashboard().await?)
    }
}

pub(crate) fn profile_from_row(row: &SqliteRow) -> Result<CustomerProfile, RepositoryError> {
    let registration_date = column::<Option<String>>(row, "registration_date")?
        .map(|raw| parse_date("registration_date", &raw))
        .transpose()?;

    Ok(CustomerProfile {
        customer_id: CustomerId(column(row, "customer_id")?),
        email: column(row, "email")?,
        full_name: column(row, "name")?,
        phone_number: column(row, "phone_number")?,
        address: column(row, "address")?,
        status: AccountStatus::from_store_label(&column::<String>(row, "account_status")?),
        registration_date,
        plan: joined_plan_from_row(row)?,
    })
}

/// Decodes the `p.*` columns of a LEFT JOIN; a NULL `plan_id` means no plan is assigned.
pub(crate) fn joined_plan_from_row(row: &SqliteRow) -> Result<Option<ServicePlan>, RepositoryError> {
    let Some(plan_id) = column::<Option<i64>>(row, "plan_id")? else {
        return Ok(None);
    };
    plan_from_row(row, plan_id, "plan_name").map(Some)
}

pub(crate) fn plan_from_row(
    row: &SqliteRow,
    plan_id: i64,
    name_column: &str,
) -> Result<ServicePlan, RepositoryError> {
    let monthly_cost = parse_decimal("monthly_cost", &column::<String>(row, "monthly_cost")?)?;
    let data_limit_gb = column::<Option<String>>(row, "data_limit_gb")?
        .map(|raw| parse_decimal("data_limit_gb", &raw))
        .transpose()?;

    Ok(ServicePlan {
        plan_id,
        name: column(row, name_column)?,
        plan_type: column(row, "plan_type")?,
        monthly_cost,
        data_limit_gb,
        voice_minutes: column(row, "voice_minutes")?,
        sms_count: column(row, "sms_count")?,
        unlimited_data: column::<i64>(row, "unlimited_data")? != 0,
        unlimited_voice: column::<i64>(row, "unlimited_voice")? != 0,
        unlimited_sms: column::<i64>(row, "unlimited_sms")? != 0,
        features: column(row, "features")?,
    })
}

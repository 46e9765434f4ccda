use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use teleassist_core::domain::account::{
    BillingStatement, NetworkIncident, NetworkIssue, ServicePlan, UsageRecord,
};
use teleassist_core::domain::identity::CustomerId;
use teleassist_core::errors::StoreError;
use teleassist_core::ports::AccountStore;

use super::customer::{joined_plan_from_row, plan_from_row};
use super::{column, parse_date, parse_decimal, parse_timestamp, RepositoryError};
use crate::SqlCustomerStore;

const USAGE_COLUMNS: &str = "u.billing_period_start, u.billing_period_end, u.data_used_gb, \
     u.voice_minutes_used, u.sms_count_used, u.additional_charges, u.total_bill_amount";

impl SqlCustomerStore {
    pub async fn find_latest_billing(
        &self,
        id: &CustomerId,
    ) -> Result<Option<BillingStatement>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USAGE_COLUMNS}, p.plan_id, p.name AS plan_name, p.plan_type, \
             p.monthly_cost, p.data_limit_gb, p.voice_minutes, p.sms_count, p.unlimited_data, \
             p.unlimited_voice, p.unlimited_sms, p.features \
             FROM customer_usage u \
             JOIN customers c ON c.customer_id = u.customer_id \
             LEFT JOIN service_plans p ON p.plan_id = c.service_plan_id \
             WHERE u.customer_id = ?1 \
             ORDER BY u.billing_period_start DESC LIMIT 1"
        ))
        .bind(&id.0)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(BillingStatement {
            customer_id: id.clone(),
            usage: usage_from_row(&row)?,
            plan: joined_plan_from_row(&row)?,
        }))
    }

    pub async fn find_usage_history(
        &self,
        id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<UsageRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USAGE_COLUMNS} FROM customer_usage u WHERE u.customer_id = ?1 \
             ORDER BY u.billing_period_start DESC LIMIT ?2"
        ))
        .bind(&id.0)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(usage_from_row).collect()
    }

    pub async fn list_plans(&self) -> Result<Vec<ServicePlan>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT plan_id, name, plan_type, monthly_cost, data_limit_gb, voice_minutes, \
             sms_count, unlimited_data, unlimited_voice, unlimited_sms, features \
             FROM service_plans ORDER BY plan_id",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| plan_from_row(row, column(row, "plan_id")?, "name"))
            .collect()
    }

    pub async fn list_network_issues(&self) -> Result<Vec<NetworkIssue>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT issue_type, symptoms, solution, category FROM common_network_issues \
             ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(NetworkIssue {
                    issue_type: column(row, "issue_type")?,
                    symptoms: column(row, "symptoms")?,
                    solution: column(row, "solution")?,
                    category: column(row, "category")?,
                })
            })
            .collect()
    }

    pub async fn list_open_incidents(&self) -> Result<Vec<NetworkIncident>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT incident_id, area, issue_type, severity, status, reported_date \
             FROM network_incidents WHERE LOWER(status) <> 'resolved' \
             ORDER BY reported_date DESC",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(NetworkIncident {
                    incident_id: column(row, "incident_id")?,
                    area: column(row, "area")?,
                    issue_type: column(row, "issue_type")?,
                    severity: column(row, "severity")?,
                    status: column(row, "status")?,
                    reported_at: column::<Option<String>>(row, "reported_date")?
                        .as_deref()
                        .and_then(parse_timestamp),
                })
            })
            .collect()
    }
}

#[async_trait]
impl AccountStore for SqlCustomerStore {
    async fn latest_billing(
        &self,
        id: &CustomerId,
    ) -> Result<Option<BillingStatement>, StoreError> {
        Ok(self.find_latest_billing(id).await?)
    }

    async fn usage_history(
        &self,
        id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<UsageRecord>, StoreError> {
        Ok(self.find_usage_history(id, limit).await?)
    }

    async fn available_plans(&self) -> Result<Vec<ServicePlan>, StoreError> {
        Ok(self.list_plans().await?)
    }

    async fn common_network_issues(&self) -> Result<Vec<NetworkIssue>, StoreError> {
        Ok(self.list_network_issues().await?)
    }

    async fn open_network_incidents(&self) -> Result<Vec<NetworkIncident>, StoreError> {
        Ok(self.list_open_incidents().await?)
    }
}

fn usage_from_row(row: &SqliteRow) -> Result<UsageRecord, RepositoryError> {
    Ok(UsageRecord {
        billing_period_start: parse_date(
            "billing_period_start",
            &column::<String>(row, "billing_period_start")?,
        )?,
        billing_period_end: parse_date(
            "billing_period_end",
            &column::<String>(row, "billing_period_end")?,
        )?,
        data_used_gb: parse_decimal("data_used_gb", &column::<String>(row, "data_used_gb")?)?,
        voice_minutes_used: column(row, "voice_minutes_used")?,
        sms_count_used: column(row, "sms_count_used")?,
        additional_charges: parse_decimal(
            "additional_charges",
            &column::<String>(row, "additional_charges")?,
        )?,
        total_bill_amount: parse_decimal(
            "total_bill_amount",
            &column::<String>(row, "total_bill_amount")?,
        )?,
    })
}

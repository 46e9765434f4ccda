use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::identity::CustomerId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    Cancelled,
    Other(String),
}

impl AccountStatus {
    pub fn from_store_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "suspended" => Self::Suspended,
            "cancelled" | "canceled" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Suspended => "Suspended",
            Self::Cancelled => "Cancelled",
            Self::Other(label) => label.as_str(),
        }
    }

    /// Suspended and cancelled accounts lose service regardless of network health.
    pub fn blocks_service(&self) -> bool {
        matches!(self, Self::Suspended | Self::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub plan_id: i64,
    pub name: String,
    pub plan_type: String,
    pub monthly_cost: Decimal,
    pub data_limit_gb: Option<Decimal>,
    pub voice_minutes: Option<i64>,
    pub sms_count: Option<i64>,
    pub unlimited_data: bool,
    pub unlimited_voice: bool,
    pub unlimited_sms: bool,
    pub features: String,
}

impl ServicePlan {
    pub fn data_allowance(&self) -> String {
        if self.unlimited_data {
            "unlimited data".to_string()
        } else {
            match self.data_limit_gb {
                Some(limit) => format!("{} GB data", limit.normalize()),
                None => "no data".to_string(),
            }
        }
    }

    pub fn voice_allowance(&self) -> String {
        if self.unlimited_voice {
            "unlimited minutes".to_string()
        } else {
            format!("{} minutes", self.voice_minutes.unwrap_or(0))
        }
    }

    pub fn sms_allowance(&self) -> String {
        if self.unlimited_sms {
            "unlimited SMS".to_string()
        } else {
            format!("{} SMS", self.sms_count.unwrap_or(0))
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} ({}, ${}/month): {}, {}, {}",
            self.name,
            self.plan_type,
            self.monthly_cost.round_dp(2),
            self.data_allowance(),
            self.voice_allowance(),
            self.sms_allowance()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub status: AccountStatus,
    pub registration_date: Option<NaiveDate>,
    pub plan: Option<ServicePlan>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub data_used_gb: Decimal,
    pub voice_minutes_used: i64,
    pub sms_count_used: i64,
    pub additional_charges: Decimal,
    pub total_bill_amount: Decimal,
}

impl UsageRecord {
    pub fn period_label(&self) -> String {
        format!("{} to {}", self.billing_period_start, self.billing_period_end)
    }
}

/// Latest usage period joined with the plan the customer is billed against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingStatement {
    pub customer_id: CustomerId,
    pub usage: UsageRecord,
    pub plan: Option<ServicePlan>,
}

impl BillingStatement {
    pub fn base_cost(&self) -> Decimal {
        self.plan.as_ref().map(|plan| plan.monthly_cost).unwrap_or(Decimal::ZERO)
    }
}

/// Aggregate-only view handed to admins. Never carries per-customer rows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub total_customers: i64,
    pub recent_registrations: i64,
    pub plan_distribution: BTreeMap<String, i64>,
    pub status_distribution: BTreeMap<String, i64>,
    pub open_incidents: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIssue {
    pub issue_type: String,
    pub symptoms: String,
    pub solution: String,
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIncident {
    pub incident_id: String,
    pub area: String,
    pub issue_type: String,
    pub severity: String,
    pub status: String,
    pub reported_at: Option<NaiveDateTime>,
}

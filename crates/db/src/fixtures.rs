use sqlx::Executor;
use tracing::{info, warn};

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Demo customers the seed guarantees, with the latest billing total each one must show.
const SEED_CUSTOMERS: &[CustomerSeedContract] = &[
    CustomerSeedContract {
        customer_id: "CUST001",
        email: "john.doe@email.com",
        full_name: "John Doe",
        plan_name: "Standard Plan",
        account_status: "Active",
        latest_total: "45.99",
        latest_total_label: "CUST001 latest bill",
        description: "Standard plan, active, bill equals plan cost",
    },
    CustomerSeedContract {
        customer_id: "CUST002",
        email: "jane.smith@email.com",
        full_name: "Jane Smith",
        plan_name: "Premium Plan",
        account_status: "Active",
        latest_total: "80.99",
        latest_total_label: "CUST002 latest bill",
        description: "Premium plan, active, bill includes additional charges",
    },
    CustomerSeedContract {
        customer_id: "CUST003",
        email: "sam.lee@email.com",
        full_name: "Sam Lee",
        plan_name: "Basic Plan",
        account_status: "Suspended",
        latest_total: "25.99",
        latest_total_label: "CUST003 latest bill",
        description: "Basic plan, suspended account",
    },
];

const SEED_ADMIN_EMAIL: &str = "admin@telecom.com";
const SEED_PLAN_COUNT: i64 = 4;
const SEED_ISSUE_COUNT: i64 = 3;
const SEED_CUSTOMER_IDS: &[&str] = &["CUST001", "CUST002", "CUST003"];
const SEED_INCIDENT_IDS: &[&str] = &["INC-2025-0142", "INC-2025-0117"];
const SEED_USER_IDS: &[i64] = &[1, 2, 3, 4];

pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let customers_seeded = SEED_CUSTOMERS
            .iter()
            .map(|customer| CustomerSeedInfo {
                customer_id: customer.customer_id,
                email: customer.email,
                description: customer.description,
            })
            .collect::<Vec<_>>();
        info!(
            event_name = "seed.loaded",
            customers = customers_seeded.len(),
            "demo seed dataset applied"
        );

        Ok(SeedResult { customers_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let admin_ok: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND role = 'admin' AND is_active = 1)",
        )
        .bind(SEED_ADMIN_EMAIL)
        .fetch_one(pool)
        .await?;
        checks.push(("admin-user", admin_ok == 1));

        let plan_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM service_plans")
            .fetch_one(pool)
            .await?;
        checks.push(("service-plans", plan_count >= SEED_PLAN_COUNT));

        let issue_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM common_network_issues")
            .fetch_one(pool)
            .await?;
        checks.push(("network-issues", issue_count >= SEED_ISSUE_COUNT));

        for customer in SEED_CUSTOMERS {
            let profile_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customers c \
                 JOIN users u ON u.id = c.user_id AND u.role = 'customer' \
                 JOIN service_plans p ON p.plan_id = c.service_plan_id \
                 WHERE c.customer_id = ?1 AND c.email = ?2 AND c.name = ?3 \
                 AND p.name = ?4 AND c.account_status = ?5)",
            )
            .bind(customer.customer_id)
            .bind(customer.email)
            .bind(customer.full_name)
            .bind(customer.plan_name)
            .bind(customer.account_status)
            .fetch_one(pool)
            .await?;
            checks.push((customer.customer_id, profile_ok == 1));

            let latest_total: Option<String> = sqlx::query_scalar(
                "SELECT total_bill_amount FROM customer_usage WHERE customer_id = ?1 \
                 ORDER BY billing_period_start DESC LIMIT 1",
            )
            .bind(customer.customer_id)
            .fetch_optional(pool)
            .await?;
            checks.push((
                customer.latest_total_label,
                latest_total.as_deref() == Some(customer.latest_total),
            ));
        }

        let open_incidents: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM network_incidents WHERE incident_id = ?1 AND status = 'open'",
        )
        .bind(SEED_INCIDENT_IDS[0])
        .fetch_one(pool)
        .await?;
        checks.push(("open-incident", open_incidents == 1));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        if !all_present {
            warn!(
                event_name = "seed.verification_failed",
                failed = checks.iter().filter(|(_, exists)| !exists).count(),
                "demo seed dataset is incomplete"
            );
        }
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded customers, their usage, logins and incidents. Catalog rows stay.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_customers = sql_array_from_ids(SEED_CUSTOMER_IDS);
        let quoted_incidents = sql_array_from_ids(SEED_INCIDENT_IDS);
        let user_ids = SEED_USER_IDS.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");

        sqlx::query(&format!("DELETE FROM customer_usage WHERE customer_id IN {quoted_customers}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM customers WHERE customer_id IN {quoted_customers}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM users WHERE id IN ({user_ids})"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM network_incidents WHERE incident_id IN {quoted_incidents}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct CustomerSeedContract {
    customer_id: &'static str,
    email: &'static str,
    full_name: &'static str,
    plan_name: &'static str,
    account_status: &'static str,
    latest_total: &'static str,
    latest_total_label: &'static str,
    description: &'static str,
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect::<Vec<_>>();
    format!("({})", quoted.join(", "))
}

#[derive(Debug, Clone)]
pub struct SeedResult {
    pub customers_seeded: Vec<CustomerSeedInfo>,
}

#[derive(Debug, Clone)]
pub struct CustomerSeedInfo {
    pub customer_id: &'static str,
    pub email: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!DemoSeedDataset::SQL.is_empty());
        assert!(DemoSeedDataset::SQL.contains("INSERT OR IGNORE"));
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoSeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = DemoSeedDataset::verify(&pool).await.expect("verify seed");
        assert!(first_verification.all_present, "{:?}", first_verification.checks);
        assert_eq!(first.customers_seeded.len(), 3);

        let second = DemoSeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification = DemoSeedDataset::verify(&pool).await.expect("re-verify seed");
        assert!(second_verification.all_present);
        assert_eq!(second.customers_seeded.len(), 3);
        assert_eq!(first_verification.checks, second_verification.checks);

        let usage_rows: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM customer_usage")
            .fetch_one(&pool)
            .await
            .expect("count usage");
        assert_eq!(usage_rows, 7);
    }

    #[tokio::test]
    async fn clean_removes_seeded_customers_but_keeps_catalog() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        DemoSeedDataset::load(&pool).await.expect("load seed fixtures");

        DemoSeedDataset::clean(&pool).await.expect("clean seed fixtures");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify after clean");
        assert!(!verification.all_present);
        let plans: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM service_plans")
            .fetch_one(&pool)
            .await
            .expect("count plans");
        assert_eq!(plans, 4);
    }

    #[test]
    fn sql_array_escapes_quotes() {
        assert_eq!(sql_array_from_ids(&["a", "o'b"]), "('a', 'o''b')");
    }
}

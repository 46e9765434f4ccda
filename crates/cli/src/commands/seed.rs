use teleassist_db::{migrations, CustomerSeedInfo, DemoSeedDataset};

use crate::commands::{
    async_runtime, connect, load_config, CommandFailure, CommandResult, EXIT_MIGRATION,
    EXIT_VERIFICATION,
};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match async_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config).await?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_MIGRATION))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_VERIFICATION))?;

        let run_result: Result<Vec<CustomerSeedInfo>, CommandFailure> =
            if verification.all_present {
                Ok(seed_result.customers_seeded)
            } else {
                let message = verification_message(&verification.checks);
                Err(("seed_verification", message, EXIT_VERIFICATION))
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(customers) => CommandResult::success("seed", seed_message(&customers)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn seed_message(customers: &[CustomerSeedInfo]) -> String {
    let lines: Vec<String> = customers
        .iter()
        .map(|customer| {
            format!("  - {}: {} ({})", customer.customer_id, customer.email, customer.description)
        })
        .collect();
    format!("telecom demo dataset loaded for {} customers:\n{}", customers.len(), lines.join("\n"))
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use teleassist_db::CustomerSeedInfo;

    use super::{seed_message, verification_message};

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [("admin-user", true), ("customer-CUST003", false), ("open-incident", false)];
        assert_eq!(
            verification_message(&checks),
            "Seed verification failed for checks: customer-CUST003, open-incident"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        assert_eq!(
            verification_message(&[("plans", true), ("users", true)]),
            "Some seed data failed to load"
        );
    }

    #[test]
    fn seed_message_lists_every_customer() {
        let customers = [CustomerSeedInfo {
            customer_id: "CUST002",
            email: "jane.smith@email.com",
            description: "Premium, Active, bill $80.99",
        }];
        let message = seed_message(&customers);
        assert!(message.starts_with("telecom demo dataset loaded for 1 customers:"));
        assert!(message.contains("  - CUST002: jane.smith@email.com (Premium, Active, bill $80.99)"));
    }
}

use serde::Serialize;
use teleassist_core::domain::identity::{normalize_email, Role};
use teleassist_db::SqlCustomerStore;

use crate::commands::{
    async_runtime, connect, load_config, CommandFailure, CommandResult, EXIT_DB_CONNECTIVITY,
};

#[derive(Debug, Serialize)]
struct LoginOutput {
    email: String,
    role: Role,
}

pub fn run(email: &str, password: &str) -> CommandResult {
    let config = match load_config("login") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match async_runtime("login") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config).await?;
        let store = SqlCustomerStore::new(pool.clone());
        let role: Result<Option<Role>, CommandFailure> = store
            .verify_credentials(email, password)
            .await
            .map_err(|error| ("credential_check", error.to_string(), EXIT_DB_CONNECTIVITY));
        pool.close().await;
        role
    });

    let output = LoginOutput {
        email: normalize_email(email).unwrap_or_default(),
        role: Role::Unknown,
    };
    match result {
        Ok(Some(role)) => CommandResult::success_with_data(
            "login",
            format!("authenticated as {}", role.as_str()),
            &LoginOutput { role, ..output },
        ),
        Ok(None) => CommandResult::denied_with_data("login", "invalid email or password", &output),
        Err(failure) => CommandResult::from_failure("login", failure),
    }
}

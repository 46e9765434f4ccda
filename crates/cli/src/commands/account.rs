use teleassist_agent::AccountView;

use crate::commands::{
    assistant, async_runtime, load_config, CommandFailure, CommandResult, EXIT_DB_CONNECTIVITY,
};

pub fn run(email: &str) -> CommandResult {
    let config = match load_config("account") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match async_runtime("account") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let assistant = assistant(&config).await?;
        let view: Result<AccountView, CommandFailure> = assistant
            .account_view(email)
            .await
            .map_err(|error| ("account_lookup", error.to_string(), EXIT_DB_CONNECTIVITY));
        view
    });

    match result {
        Ok(view) => render(&view),
        Err(failure) => CommandResult::from_failure("account", failure),
    }
}

fn render(view: &AccountView) -> CommandResult {
    match view {
        AccountView::Admin { .. } => {
            CommandResult::success_with_data("account", "admin dashboard (aggregate only)", view)
        }
        AccountView::Customer { profile, .. } => CommandResult::success_with_data(
            "account",
            format!("customer profile for {}", profile.customer_id.as_str()),
            view,
        ),
        AccountView::Unknown { message, .. } => {
            CommandResult::denied_with_data("account", message.clone(), view)
        }
    }
}

pub mod account;
pub mod ask;
pub mod config;
pub mod doctor;
pub mod login;
pub mod migrate;
pub mod seed;

use serde::Serialize;
use serde_json::Value;
use teleassist_agent::AssistantRuntime;
use teleassist_core::config::{AppConfig, LoadOptions};
use teleassist_db::{connect_with_config, DbPool};

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_VERIFICATION: u8 = 6;

/// `(error_class, message, exit_code)` carried out of a command's async block.
pub type CommandFailure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::with_status(command, "ok", message, None)
    }

    /// Successful outcome carrying a structured payload under `data`.
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        Self::with_data(command, "ok", message, data)
    }

    /// The command ran, but the caller was refused. Not an operator error.
    pub fn denied_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        Self::with_data(command, "denied", message, data)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_failure(command: &str, (error_class, message, exit_code): CommandFailure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }

    fn with_status(
        command: &str,
        status: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: status.to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    fn with_data(
        command: &str,
        status: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::with_status(command, status, message, Some(data)),
            Err(error) => Self::failure(command, "serialization", error.to_string(), EXIT_RUNTIME),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn async_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

pub(crate) async fn connect(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))
}

pub(crate) async fn assistant(config: &AppConfig) -> Result<AssistantRuntime, CommandFailure> {
    let pool = connect(config).await?;
    AssistantRuntime::from_pool(pool, config)
        .await
        .map_err(|error| ("runtime_init", format!("{error:#}"), EXIT_RUNTIME))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::CommandResult;

    fn parse(result: &CommandResult) -> Value {
        serde_json::from_str(&result.output).expect("valid json")
    }

    #[test]
    fn failure_payload_carries_error_class_and_exit_code() {
        let result = CommandResult::failure("seed", "migration", "boom", 5);
        assert_eq!(result.exit_code, 5);
        let payload = parse(&result);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "migration");
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn data_payload_is_nested_under_data() {
        let result =
            CommandResult::success_with_data("login", "ok", &serde_json::json!({"role": "admin"}));
        assert_eq!(result.exit_code, 0);
        let payload = parse(&result);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["error_class"], Value::Null);
        assert_eq!(payload["data"]["role"], "admin");
    }

    #[test]
    fn denied_exits_cleanly() {
        let result = CommandResult::denied_with_data(
            "ask",
            "Please log in",
            &serde_json::json!({"terminal": "denied"}),
        );
        assert_eq!(result.exit_code, 0);
        let payload = parse(&result);
        assert_eq!(payload["status"], "denied");
        assert_eq!(payload["data"]["terminal"], "denied");
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use teleassist_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILES};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "TELEASSIST_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "TELEASSIST_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "TELEASSIST_DATABASE_TIMEOUT_SECS",
        ),
        ("llm.provider", config.llm.provider.as_str().to_string(), "TELEASSIST_LLM_PROVIDER"),
        ("llm.model", config.llm.model.clone(), "TELEASSIST_LLM_MODEL"),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "TELEASSIST_LLM_BASE_URL",
        ),
        ("llm.api_key", redact_secret(config.llm.api_key.as_ref()), "TELEASSIST_LLM_API_KEY"),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), "TELEASSIST_LLM_TIMEOUT_SECS"),
        ("llm.max_retries", config.llm.max_retries.to_string(), "TELEASSIST_LLM_MAX_RETRIES"),
        ("llm.temperature", config.llm.temperature.to_string(), "TELEASSIST_LLM_TEMPERATURE"),
        (
            "knowledge.documents_path",
            config.knowledge.documents_path.display().to_string(),
            "TELEASSIST_KNOWLEDGE_DOCUMENTS_PATH",
        ),
        ("knowledge.top_k", config.knowledge.top_k.to_string(), "TELEASSIST_KNOWLEDGE_TOP_K"),
        ("logging.level", config.logging.level.clone(), "TELEASSIST_LOGGING_LEVEL"),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            "TELEASSIST_LOGGING_FORMAT",
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        entries
            .into_iter()
            .map(|(key, value, env_key)| render_line(key, &value, source(key, env_key))),
    );
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognisable key prefix (`sk-***`) and drops everything else.
fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

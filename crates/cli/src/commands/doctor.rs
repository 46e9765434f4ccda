use serde::Serialize;
use teleassist_agent::{build_llm_client, DocumentIndex};
use teleassist_core::config::{AppConfig, LoadOptions};
use teleassist_db::{connect_with_config, migrations, DemoSeedDataset};

use crate::commands::{CommandResult, EXIT_VERIFICATION};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, because: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {because}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn from_checks(checks: Vec<DoctorCheck>) -> Self {
        let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
        let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
        let summary = if all_pass {
            "doctor: all readiness checks passed".to_string()
        } else {
            "doctor: one or more readiness checks failed".to_string()
        };
        Self { overall_status, summary, checks }
    }
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_VERIFICATION };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return DoctorReport::from_checks(vec![
                DoctorCheck::fail("config_validation", error.to_string()),
                DoctorCheck::skipped("llm_client", "configuration did not load"),
                DoctorCheck::skipped("database_connectivity", "configuration did not load"),
                DoctorCheck::skipped("schema_migrations", "configuration did not load"),
                DoctorCheck::skipped("seed_data", "configuration did not load"),
                DoctorCheck::skipped("knowledge_documents", "configuration did not load"),
            ]);
        }
    };

    let mut checks = vec![
        DoctorCheck::pass("config_validation", "configuration loaded and validated"),
        check_llm_client(&config),
    ];

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(DoctorCheck::fail(
                "database_connectivity",
                format!("failed to initialize async runtime: {error}"),
            ));
            return DoctorReport::from_checks(checks);
        }
    };

    runtime.block_on(async {
        checks.extend(check_database(&config).await);
        checks.push(check_documents(&config).await);
    });

    DoctorReport::from_checks(checks)
}

fn check_llm_client(config: &AppConfig) -> DoctorCheck {
    match build_llm_client(&config.llm) {
        Ok(client) => DoctorCheck::pass(
            "llm_client",
            format!("{} client ready (model `{}`)", client.provider(), config.llm.model),
        ),
        Err(error) => DoctorCheck::fail("llm_client", format!("{error:#}")),
    }
}

async fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let pool = match connect_with_config(&config.database).await {
        Ok(pool) => pool,
        Err(error) => {
            return vec![
                DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to connect to database: {error}"),
                ),
                DoctorCheck::skipped("schema_migrations", "the database is unreachable"),
                DoctorCheck::skipped("seed_data", "the database is unreachable"),
            ];
        }
    };

    let mut checks = vec![DoctorCheck::pass(
        "database_connectivity",
        format!("connected using `{}`", config.database.url),
    )];

    let schema_ready = match migrations::missing_tables(&pool).await {
        Ok(missing) if missing.is_empty() => {
            checks.push(DoctorCheck::pass("schema_migrations", "all managed tables present"));
            true
        }
        Ok(missing) => {
            checks.push(DoctorCheck::fail(
                "schema_migrations",
                format!("missing tables: {} (run `teleassist migrate`)", missing.join(", ")),
            ));
            false
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("schema_migrations", error.to_string()));
            false
        }
    };

    if schema_ready {
        checks.push(match DemoSeedDataset::verify(&pool).await {
            Ok(verification) if verification.all_present => {
                DoctorCheck::pass("seed_data", "demo dataset present and consistent")
            }
            Ok(verification) => {
                let failed = verification
                    .checks
                    .iter()
                    .filter_map(|(check, passed)| (!passed).then_some(*check))
                    .collect::<Vec<_>>();
                DoctorCheck::fail(
                    "seed_data",
                    format!("failed checks: {} (run `teleassist seed`)", failed.join(", ")),
                )
            }
            Err(error) => DoctorCheck::fail("seed_data", error.to_string()),
        });
    } else {
        checks.push(DoctorCheck::skipped("seed_data", "the schema is incomplete"));
    }

    pool.close().await;
    checks
}

async fn check_documents(config: &AppConfig) -> DoctorCheck {
    let path = &config.knowledge.documents_path;
    match DocumentIndex::load_dir(path).await {
        Ok(index) if index.is_empty() => DoctorCheck::fail(
            "knowledge_documents",
            format!("no .md or .txt passages found under `{}`", path.display()),
        ),
        Ok(index) => DoctorCheck::pass(
            "knowledge_documents",
            format!("{} passages indexed from `{}`", index.len(), path.display()),
        ),
        Err(error) => DoctorCheck::fail("knowledge_documents", error.to_string()),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{render_human, CheckStatus, DoctorCheck, DoctorReport};

    #[test]
    fn any_failed_or_skipped_check_fails_the_report() {
        let report = DoctorReport::from_checks(vec![
            DoctorCheck::pass("config_validation", "ok"),
            DoctorCheck::skipped("seed_data", "the schema is incomplete"),
        ]);
        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert_eq!(report.summary, "doctor: one or more readiness checks failed");
    }

    #[test]
    fn human_rendering_marks_each_check() {
        let report = DoctorReport::from_checks(vec![
            DoctorCheck::pass("config_validation", "configuration loaded and validated"),
            DoctorCheck::fail("knowledge_documents", "no passages"),
        ]);
        let rendered = render_human(&report);
        assert!(rendered.contains("- [ok] config_validation: configuration loaded and validated"));
        assert!(rendered.contains("- [fail] knowledge_documents: no passages"));
    }
}

use approvals_core::config::{AppConfig, LoadOptions};
use approvals_core::loader::{load_snapshot, LoadedSnapshot};
use approvals_core::Currency;
use serde::Serialize;

use super::{escape_json, CommandResult, EXIT_NEEDS_ATTENTION, EXIT_OK};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { EXIT_NEEDS_ATTENTION } else { EXIT_OK };

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
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match load_snapshot(&config.policy) {
                Ok(loaded) => checks.extend(data_checks(&loaded)),
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "policy_data",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.extend(skipped(&["roster_ingest", "rate_coverage"], "policy data did not load"));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(skipped(
                &["policy_data", "roster_ingest", "rate_coverage"],
                "configuration did not load",
            ));
        }
    }

    let overall_status = if checks.iter().any(|check| check.status == CheckStatus::Fail) {
        CheckStatus::Fail
    } else if checks.iter().any(|check| check.status == CheckStatus::Warn) {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    };
    let summary = match overall_status {
        CheckStatus::Pass => "doctor: all readiness checks passed",
        CheckStatus::Warn => "doctor: ready with warnings",
        _ => "doctor: one or more readiness checks failed",
    }
    .to_string();

    DoctorReport { overall_status, summary, checks }
}

fn data_checks(loaded: &LoadedSnapshot) -> Vec<DoctorCheck> {
    let snapshot = &loaded.snapshot;
    let mut checks = vec![DoctorCheck {
        name: "policy_data",
        status: CheckStatus::Pass,
        details: format!(
            "{} tiers and {} extensions validated (source: {})",
            snapshot.policy.tiers().len(),
            snapshot.extensions.len(),
            loaded.sources.policy
        ),
    }];

    checks.push(if loaded.roster_issues.is_empty() {
        DoctorCheck {
            name: "roster_ingest",
            status: CheckStatus::Pass,
            details: format!("{} candidates ingested (source: {})", snapshot.roster.len(), loaded.sources.roster),
        }
    } else {
        let rejected: Vec<String> = loaded
            .roster_issues
            .iter()
            .map(|issue| format!("{} ({})", issue.record_id, issue.reason))
            .collect();
        DoctorCheck {
            name: "roster_ingest",
            status: CheckStatus::Warn,
            details: format!(
                "{} candidates ingested, {} rejected: {}",
                snapshot.roster.len(),
                rejected.len(),
                rejected.join(", ")
            ),
        }
    });

    let uncovered = snapshot.rates.uncovered();
    checks.push(if uncovered.is_empty() {
        DoctorCheck {
            name: "rate_coverage",
            status: CheckStatus::Pass,
            details: format!(
                "rates cover all {} supported currencies (reference {})",
                Currency::ALL.len(),
                snapshot.rates.reference()
            ),
        }
    } else {
        let codes: Vec<&str> = uncovered.iter().map(Currency::code).collect();
        DoctorCheck {
            name: "rate_coverage",
            status: CheckStatus::Warn,
            details: format!("no exchange rate for {}; amounts in them evaluate as 0", codes.join(", ")),
        }
    });

    checks
}

fn skipped(names: &[&'static str], reason: &str) -> Vec<DoctorCheck> {
    names
        .iter()
        .map(|&name| DoctorCheck {
            name,
            status: CheckStatus::Skipped,
            details: format!("skipped because {reason}"),
        })
        .collect()
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approvals_core::config::PolicyDataConfig;

    #[test]
    fn reference_data_passes_every_data_check() {
        let loaded = load_snapshot(&PolicyDataConfig::default()).expect("reference data loads");
        let checks = data_checks(&loaded);

        let status = |name: &str| {
            checks.iter().find(|check| check.name == name).map(|check| check.status)
        };
        assert_eq!(status("policy_data"), Some(CheckStatus::Pass));
        assert_eq!(status("rate_coverage"), Some(CheckStatus::Pass));
        assert_eq!(status("roster_ingest"), Some(CheckStatus::Pass));
    }

    #[test]
    fn rejected_roster_rows_are_a_warning() {
        let mut loaded = load_snapshot(&PolicyDataConfig::default()).expect("reference data loads");
        let mut records = approvals_core::fixtures::demo_roster_records();
        records.push(records[0].clone());
        let (roster, issues) = approvals_core::Roster::ingest(records);
        loaded.snapshot.roster = roster;
        loaded.roster_issues = issues;

        let checks = data_checks(&loaded);
        let roster_check =
            checks.iter().find(|check| check.name == "roster_ingest").expect("roster check present");

        assert_eq!(roster_check.status, CheckStatus::Warn);
        assert!(roster_check.details.contains("emp-001 (duplicate id)"));
    }

    #[test]
    fn skipped_checks_carry_the_reason() {
        let checks = skipped(&["rate_coverage"], "configuration did not load");

        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, CheckStatus::Skipped);
        assert_eq!(checks[0].details, "skipped because configuration did not load");
    }
}

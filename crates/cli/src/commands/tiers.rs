use approvals_core::{ApprovalPolicyTier, ApprovalRequirement, EngineSnapshot, SpecialCaseExtension};
use serde::Serialize;

use super::{load_engine, to_pretty_json, CommandResult, EXIT_CONFIG};

const COMMAND: &str = "tiers";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyListing<'a> {
    reference_currency: &'a str,
    source: &'a str,
    tiers: &'a [ApprovalPolicyTier],
    extensions: Vec<&'a SpecialCaseExtension>,
}

pub fn run(json_output: bool) -> CommandResult {
    let (_, loaded) = match load_engine() {
        Ok(engine) => engine,
        Err(error) => return CommandResult::failure(COMMAND, "configuration", format!("{error:#}"), EXIT_CONFIG),
    };

    if json_output {
        let listing = listing(&loaded.snapshot, &loaded.sources.policy);
        return to_pretty_json(COMMAND, &listing);
    }

    CommandResult { exit_code: 0, output: render_human(&loaded.snapshot) }
}

fn listing<'a>(snapshot: &'a EngineSnapshot, source: &'a str) -> PolicyListing<'a> {
    PolicyListing {
        reference_currency: snapshot.rates.reference().code(),
        source,
        tiers: snapshot.policy.tiers(),
        extensions: snapshot
            .extensions
            .transaction_types()
            .into_iter()
            .filter_map(|kind| snapshot.extensions.get(kind))
            .collect(),
    }
}

fn render_human(snapshot: &EngineSnapshot) -> String {
    let reference = snapshot.rates.reference();
    let mut lines = vec![format!("policy tiers (amounts in {reference}):")];

    for tier in snapshot.policy.tiers() {
        let upper = tier.max_amount.map(|max| max.to_string()).unwrap_or_else(|| "unbounded".to_string());
        lines.push(format!(
            "{} [{}, {}) {:?}: {}",
            tier.id, tier.min_amount, upper, tier.risk_level, tier.description
        ));
        lines.extend(tier.requirements.iter().map(render_requirement));
    }

    let kinds = snapshot.extensions.transaction_types();
    if !kinds.is_empty() {
        lines.push("extensions:".to_string());
        for kind in kinds {
            let Some(extension) = snapshot.extensions.get(kind) else {
                continue;
            };
            lines.push(format!("{}: {}", extension.transaction_type, extension.description));
            lines.extend(extension.additional_roles.iter().map(render_requirement));
        }
    }

    lines.join("\n")
}

fn render_requirement(requirement: &ApprovalRequirement) -> String {
    let department = requirement.department.as_deref().unwrap_or("any department");
    let fallback = if requirement.fallback_departments.is_empty() {
        String::new()
    } else {
        format!(", fallback {}", requirement.fallback_departments.join("/"))
    };
    format!(
        "  - [p{}] {} x{} ({department}{fallback}): {}",
        requirement.priority, requirement.role, requirement.count, requirement.description
    )
}

use std::str::FromStr;
use std::sync::Arc;

use approvals_core::{ApproverSelector, Currency, PolicyMatchResult};
use rust_decimal::Decimal;

use super::{load_engine, to_pretty_json, CommandResult, EXIT_CONFIG, EXIT_INVALID_INPUT, EXIT_NEEDS_ATTENTION};

const COMMAND: &str = "evaluate";

pub fn run(amount: &str, currency: &str, transaction_type: Option<&str>, json_output: bool) -> CommandResult {
    let amount = match Decimal::from_str(amount.trim()) {
        Ok(amount) => amount,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_amount",
                format!("`{amount}` is not a decimal amount: {error}"),
                EXIT_INVALID_INPUT,
            )
        }
    };
    let currency = match Currency::from_str(currency) {
        Ok(currency) => currency,
        Err(error) => {
            return CommandResult::failure(COMMAND, "unsupported_currency", error.to_string(), EXIT_INVALID_INPUT)
        }
    };

    let (_, loaded) = match load_engine() {
        Ok(engine) => engine,
        Err(error) => return CommandResult::failure(COMMAND, "configuration", format!("{error:#}"), EXIT_CONFIG),
    };

    let selector = ApproverSelector::new(Arc::new(loaded.snapshot));
    let result = match selector.select_approvers(amount, currency, transaction_type) {
        Ok(result) => result,
        Err(error) => {
            return CommandResult::failure(COMMAND, "invalid_amount", error.to_string(), EXIT_INVALID_INPUT)
        }
    };

    let mut outcome = if json_output {
        to_pretty_json(COMMAND, &result)
    } else {
        CommandResult { exit_code: 0, output: render_human(&result, amount, currency) }
    };
    if outcome.exit_code == 0 && !result.is_fully_staffed() {
        outcome.exit_code = EXIT_NEEDS_ATTENTION;
    }
    outcome
}

pub(crate) fn render_human(result: &PolicyMatchResult, amount: Decimal, currency: Currency) -> String {
    let mut lines = vec![format!(
        "{amount} {currency} -> {} ({:?} risk): {}",
        result.tier.id, result.tier.risk_level, result.tier.description
    )];

    if result.selected_approvers.is_empty() {
        lines.push("selected approvers: none".to_string());
    } else {
        lines.push("selected approvers:".to_string());
        for approver in &result.selected_approvers {
            lines.push(format!(
                "- [p{}] {} {} ({}) {}",
                approver.priority, approver.id, approver.name, approver.role, approver.reason
            ));
        }
    }

    if !result.missing_requirements.is_empty() {
        lines.push("unfilled requirements:".to_string());
        for requirement in &result.missing_requirements {
            lines.push(format!(
                "- [p{}] {} x{}: {}",
                requirement.priority,
                requirement.role,
                requirement.count,
                requirement.description
            ));
        }
    }

    for warning in &result.warnings {
        lines.push(format!("warning: {warning}"));
    }

    lines.join("\n")
}

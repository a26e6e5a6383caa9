pub mod resolver;

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::currency::Currency;
use crate::domain::policy::{ApprovalPolicyTier, ApprovalRequirement};
use crate::domain::result::PolicyMatchResult;
use crate::errors::EngineError;
use crate::policy::match_tier;
use crate::snapshot::EngineSnapshot;

pub const NO_POLICY_WARNING: &str = "no policy found for this amount";

/// Runs one evaluation against a fixed snapshot. Identical inputs against the
/// same snapshot always yield identical results.
#[derive(Clone, Debug)]
pub struct ApproverSelector {
    snapshot: Arc<EngineSnapshot>,
}

impl ApproverSelector {
    pub fn new(snapshot: Arc<EngineSnapshot>) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &EngineSnapshot {
        &self.snapshot
    }

    pub fn select_approvers(
        &self,
        amount: Decimal,
        currency: Currency,
        transaction_type: Option<&str>,
    ) -> Result<PolicyMatchResult, EngineError> {
        let snapshot = &self.snapshot;
        let conversion = snapshot.rates.convert_to_reference(amount, currency)?;
        let mut warnings: Vec<String> =
            conversion.warning.iter().map(|warning| warning.message()).collect();

        let Some(tier) = match_tier(conversion.reference_amount, snapshot.policy.tiers()) else {
            warn!(
                event_name = "engine.selection.no_policy",
                reference_amount = conversion.reference_amount,
                currency = %currency,
                "no policy tier contains the amount"
            );
            warnings.push(NO_POLICY_WARNING.to_string());
            return Ok(PolicyMatchResult {
                tier: ApprovalPolicyTier::no_match(),
                selected_approvers: Vec::new(),
                missing_requirements: Vec::new(),
                warnings,
            });
        };

        let requirements = self.working_requirements(tier, transaction_type);

        let mut excluded: HashSet<String> = HashSet::new();
        let mut selected = Vec::new();
        let mut missing = Vec::new();

        for requirement in requirements {
            let resolved = resolver::resolve(
                &requirement,
                snapshot.roster.candidates(),
                &excluded,
                &snapshot.title_ranks,
            );
            excluded.extend(resolved.iter().map(|approver| approver.id.clone()));

            let found = resolved.len();
            selected.extend(resolved);

            if found < requirement.count as usize {
                warn!(
                    event_name = "engine.selection.shortfall",
                    tier_id = %tier.id,
                    requirement = %requirement.description,
                    needed = requirement.count,
                    found,
                    "requirement could not be fully staffed"
                );
                warnings.push(format!(
                    "{}: need {}, found {}",
                    requirement.description, requirement.count, found
                ));
                missing.push(requirement);
            }
        }

        info!(
            event_name = "engine.selection.completed",
            tier_id = %tier.id,
            reference_amount = conversion.reference_amount,
            selected = selected.len(),
            missing = missing.len(),
            "approver selection completed"
        );

        Ok(PolicyMatchResult {
            tier: tier.clone(),
            selected_approvers: selected,
            missing_requirements: missing,
            warnings,
        })
    }

    /// Tier requirements followed by any extension requirements, stably
    /// sorted by priority so equal priorities keep table order.
    fn working_requirements(
        &self,
        tier: &ApprovalPolicyTier,
        transaction_type: Option<&str>,
    ) -> Vec<ApprovalRequirement> {
        let mut requirements = tier.requirements.clone();

        if let Some(transaction_type) = transaction_type {
            match self.snapshot.extensions.get(transaction_type) {
                Some(extension) => requirements.extend(extension.additional_roles.iter().cloned()),
                None => debug!(
                    event_name = "engine.selection.unknown_transaction_type",
                    transaction_type,
                    "no extension registered for transaction type"
                ),
            }
        }

        requirements.sort_by_key(|requirement| requirement.priority);
        requirements
    }
}

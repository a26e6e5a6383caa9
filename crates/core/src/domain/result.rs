use serde::{Deserialize, Serialize};

use crate::domain::candidate::Role;
use crate::domain::policy::{ApprovalPolicyTier, ApprovalRequirement, NO_POLICY_TIER_ID};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedApprover {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub department: Option<String>,
    /// Priority of the requirement this approver satisfies.
    pub priority: i32,
    pub is_auto_selected: bool,
    pub reason: String,
}

/// Outcome of one evaluation. A value without identity; callers must inspect
/// `missing_requirements` and `warnings` even when evaluation succeeded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyMatchResult {
    pub tier: ApprovalPolicyTier,
    pub selected_approvers: Vec<SelectedApprover>,
    pub missing_requirements: Vec<ApprovalRequirement>,
    pub warnings: Vec<String>,
}

impl PolicyMatchResult {
    pub fn is_unmatched(&self) -> bool {
        self.tier.id == NO_POLICY_TIER_ID
    }

    pub fn is_fully_staffed(&self) -> bool {
        !self.is_unmatched() && self.missing_requirements.is_empty()
    }

    pub fn approver_ids(&self) -> Vec<&str> {
        self.selected_approvers.iter().map(|approver| approver.id.as_str()).collect()
    }
}

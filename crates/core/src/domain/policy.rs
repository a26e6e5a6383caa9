use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::candidate::{normalize_key, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequirement {
    pub role: Role,
    #[serde(default)]
    pub department: Option<String>,
    /// Departments that may staff the slots the primary department cannot.
    #[serde(default)]
    pub fallback_departments: Vec<String>,
    pub count: u32,
    pub priority: i32,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPolicyTier {
    pub id: String,
    pub min_amount: u64,
    /// Exclusive upper bound; `None` means unbounded.
    #[serde(default)]
    pub max_amount: Option<u64>,
    pub risk_level: RiskLevel,
    pub requirements: Vec<ApprovalRequirement>,
    pub description: String,
}

pub const NO_POLICY_TIER_ID: &str = "no_policy";

impl ApprovalPolicyTier {
    /// Placeholder tier reported when no configured range contains the amount.
    pub fn no_match() -> Self {
        Self {
            id: NO_POLICY_TIER_ID.to_string(),
            min_amount: 0,
            max_amount: Some(0),
            risk_level: RiskLevel::Critical,
            requirements: Vec::new(),
            description: "no policy matched".to_string(),
        }
    }

    pub fn contains(&self, amount: u64) -> bool {
        amount >= self.min_amount && self.max_amount.map_or(true, |max| amount < max)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy table has no tiers")]
    Empty,
    #[error("requirement `{description}` in tier `{tier_id}` has count 0")]
    ZeroCount { tier_id: String, description: String },
    #[error("extension requirement `{description}` for `{transaction_type}` has count 0")]
    ZeroExtensionCount { transaction_type: String, description: String },
    #[error("tier `{tier_id}` has max_amount {max} not above min_amount {min}")]
    EmptyRange { tier_id: String, min: u64, max: u64 },
    #[error("tiers `{first}` and `{second}` overlap")]
    Overlap { first: String, second: String },
    #[error("gap between tier `{first}` (ends {end}) and tier `{second}` (starts {start})")]
    Gap { first: String, second: String, end: u64, start: u64 },
    #[error("tier `{tier_id}` is unbounded but is not the highest tier")]
    UnboundedNotLast { tier_id: String },
    #[error("highest tier `{tier_id}` must be unbounded")]
    BoundedTop { tier_id: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    tiers: Vec<ApprovalPolicyTier>,
}

impl PolicyTable {
    pub fn new(tiers: Vec<ApprovalPolicyTier>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[ApprovalPolicyTier] {
        &self.tiers
    }

    /// Checks that the ranges are contiguous, non-overlapping and end
    /// unbounded, and that every requirement needs at least one approver.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.tiers.is_empty() {
            return Err(PolicyError::Empty);
        }

        for tier in &self.tiers {
            if let Some(requirement) = tier.requirements.iter().find(|r| r.count == 0) {
                return Err(PolicyError::ZeroCount {
                    tier_id: tier.id.clone(),
                    description: requirement.description.clone(),
                });
            }
            if let Some(max) = tier.max_amount {
                if max <= tier.min_amount {
                    return Err(PolicyError::EmptyRange {
                        tier_id: tier.id.clone(),
                        min: tier.min_amount,
                        max,
                    });
                }
            }
        }

        let mut ordered: Vec<&ApprovalPolicyTier> = self.tiers.iter().collect();
        ordered.sort_by_key(|tier| tier.min_amount);

        for pair in ordered.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            let Some(end) = first.max_amount else {
                return Err(PolicyError::UnboundedNotLast { tier_id: first.id.clone() });
            };
            if end > second.min_amount {
                return Err(PolicyError::Overlap {
                    first: first.id.clone(),
                    second: second.id.clone(),
                });
            }
            if end < second.min_amount {
                return Err(PolicyError::Gap {
                    first: first.id.clone(),
                    second: second.id.clone(),
                    end,
                    start: second.min_amount,
                });
            }
        }

        if let Some(top) = ordered.last() {
            if top.max_amount.is_some() {
                return Err(PolicyError::BoundedTop { tier_id: top.id.clone() });
            }
        }

        if let Some(bottom) = ordered.first() {
            if bottom.min_amount > 0 {
                warn!(
                    event_name = "engine.policy.uncovered_floor",
                    tier_id = %bottom.id,
                    min_amount = bottom.min_amount,
                    "policy table does not start at 0; smaller amounts will match no tier"
                );
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialCaseExtension {
    pub transaction_type: String,
    pub additional_roles: Vec<ApprovalRequirement>,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionTable {
    by_type: HashMap<String, SpecialCaseExtension>,
}

impl ExtensionTable {
    pub fn new(extensions: Vec<SpecialCaseExtension>) -> Self {
        let by_type = extensions
            .into_iter()
            .map(|extension| (normalize_key(&extension.transaction_type), extension))
            .collect();
        Self { by_type }
    }

    pub fn get(&self, transaction_type: &str) -> Option<&SpecialCaseExtension> {
        self.by_type.get(&normalize_key(transaction_type))
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        for extension in self.by_type.values() {
            if let Some(requirement) = extension.additional_roles.iter().find(|r| r.count == 0) {
                return Err(PolicyError::ZeroExtensionCount {
                    transaction_type: extension.transaction_type.clone(),
                    description: requirement.description.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn transaction_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> =
            self.by_type.values().map(|extension| extension.transaction_type.as_str()).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRank {
    pub title: String,
    pub rank: u8,
}

/// Ranks keyed by exact (case-insensitive) position title.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TitleRankTable {
    ranks: HashMap<String, u8>,
}

impl TitleRankTable {
    pub fn new(entries: Vec<TitleRank>) -> Self {
        let ranks = entries.into_iter().map(|entry| (normalize_key(&entry.title), entry.rank)).collect();
        Self { ranks }
    }

    pub fn rank_for(&self, title: &str) -> Option<u8> {
        self.ranks.get(&normalize_key(title)).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

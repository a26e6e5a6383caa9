use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Operator,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Operator => "operator",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the current role names plus the legacy directory aliases.
impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_key(value).as_str() {
            "admin" => Ok(Self::Admin),
            "manager" | "approver" | "required_approver" => Ok(Self::Manager),
            "operator" | "initiator" => Ok(Self::Operator),
            "viewer" => Ok(Self::Viewer),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Active,
    Inactive,
    Pending,
}

impl FromStr for CandidateStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_key(value).as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "pending" => Ok(Self::Pending),
            other => Err(format!("unknown status `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverCandidate {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub department: Option<String>,
    pub status: CandidateStatus,
    /// Position or title as shown in the directory.
    pub position: Option<String>,
    /// Explicit selection rank; takes precedence over the title rank table.
    #[serde(default)]
    pub rank: Option<u8>,
}

impl ApproverCandidate {
    pub fn is_active(&self) -> bool {
        self.status == CandidateStatus::Active
    }

    pub fn in_department(&self, department: &str) -> bool {
        self.department
            .as_deref()
            .map(|own| normalize_key(own) == normalize_key(department))
            .unwrap_or(false)
    }
}

/// A roster row exactly as the directory collaborator delivers it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub department: Option<String>,
    pub status: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub rank: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestIssue {
    pub record_id: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    candidates: Vec<ApproverCandidate>,
}

impl Roster {
    pub fn new(candidates: Vec<ApproverCandidate>) -> Self {
        Self { candidates }
    }

    /// Normalizes raw feed rows into candidates, keeping feed order.
    ///
    /// Rows with an empty or duplicate id, an unknown role, or an unknown
    /// status are dropped and reported.
    pub fn ingest(records: Vec<RosterRecord>) -> (Self, Vec<IngestIssue>) {
        let mut candidates = Vec::with_capacity(records.len());
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for record in records {
            let id = record.id.trim().to_string();
            if id.is_empty() {
                issues.push(IngestIssue {
                    record_id: "<empty>".to_string(),
                    reason: format!("record `{}` has an empty id", record.name),
                });
                continue;
            }
            let role = match record.role.parse::<Role>() {
                Ok(role) => role,
                Err(reason) => {
                    issues.push(IngestIssue { record_id: id, reason });
                    continue;
                }
            };
            let status = match record.status.parse::<CandidateStatus>() {
                Ok(status) => status,
                Err(reason) => {
                    issues.push(IngestIssue { record_id: id, reason });
                    continue;
                }
            };

            // only accepted rows claim an id
            if !seen.insert(id.clone()) {
                issues.push(IngestIssue { record_id: id, reason: "duplicate id".to_string() });
                continue;
            }

            candidates.push(ApproverCandidate {
                id,
                name: record.name.trim().to_string(),
                role,
                department: non_empty(record.department),
                status,
                position: non_empty(record.position),
                rank: record.rank,
            });
        }

        for issue in &issues {
            warn!(
                event_name = "engine.roster.record_rejected",
                record_id = %issue.record_id,
                reason = %issue.reason,
                "roster record rejected during ingestion"
            );
        }

        (Self { candidates }, issues)
    }

    pub fn candidates(&self) -> &[ApproverCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

pub(crate) fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

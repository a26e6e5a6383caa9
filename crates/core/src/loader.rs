//! Reads policy, rate and roster data files into an [`EngineSnapshot`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::config::PolicyDataConfig;
use crate::currency::{Currency, RateTable};
use crate::domain::candidate::{IngestIssue, Role, Roster, RosterRecord};
use crate::domain::policy::{
    ApprovalPolicyTier, ApprovalRequirement, ExtensionTable, PolicyError, PolicyTable, RiskLevel,
    SpecialCaseExtension, TitleRank, TitleRankTable,
};
use crate::fixtures;
use crate::snapshot::EngineSnapshot;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read data file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse policy file `{path}`: {source}")]
    ParsePolicy { path: PathBuf, source: toml::de::Error },
    #[error("could not parse rates file `{path}`: {source}")]
    ParseRates { path: PathBuf, source: toml::de::Error },
    #[error("could not parse roster file `{path}`: {source}")]
    ParseRoster { path: PathBuf, source: serde_json::Error },
    #[error("requirement `{requirement}` uses unknown role `{role}`")]
    InvalidRole { requirement: String, role: String },
    #[error("rates file `{path}` names unsupported currency `{code}`")]
    UnknownCurrency { path: PathBuf, code: String },
    #[error("rate for `{code}` is not a non-negative decimal: `{value}`")]
    InvalidRate { code: String, value: String },
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Where each part of a snapshot came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataSources {
    pub policy: String,
    pub rates: String,
    pub roster: String,
}

#[derive(Clone, Debug)]
pub struct LoadedSnapshot {
    pub snapshot: EngineSnapshot,
    pub roster_issues: Vec<IngestIssue>,
    pub sources: DataSources,
}

pub fn load_snapshot(config: &PolicyDataConfig) -> Result<LoadedSnapshot, LoadError> {
    let (policy, extensions, title_ranks) = match config.policy_path.as_deref() {
        Some(path) => load_policy_file(path)?,
        None => (
            fixtures::reference_policy_table(),
            fixtures::reference_extensions(),
            fixtures::reference_title_ranks(),
        ),
    };
    policy.validate()?;
    extensions.validate()?;

    let rates = match config.rates_path.as_deref() {
        Some(path) => load_rates_file(path)?,
        None => fixtures::reference_rates(),
    };

    let records = match config.roster_path.as_deref() {
        Some(path) => load_roster_file(path)?,
        None => fixtures::demo_roster_records(),
    };
    let (roster, roster_issues) = Roster::ingest(records);

    let sources = DataSources {
        policy: describe_source(config.policy_path.as_deref()),
        rates: describe_source(config.rates_path.as_deref()),
        roster: describe_source(config.roster_path.as_deref()),
    };

    info!(
        event_name = "system.data.snapshot_loaded",
        tiers = policy.tiers().len(),
        extensions = extensions.len(),
        roster_size = roster.len(),
        rejected_records = roster_issues.len(),
        policy_source = %sources.policy,
        "engine snapshot loaded"
    );

    Ok(LoadedSnapshot {
        snapshot: EngineSnapshot::new(roster, policy, extensions, rates, title_ranks),
        roster_issues,
        sources,
    })
}

fn describe_source(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string()).unwrap_or_else(|| "built-in reference".to_string())
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::ReadFile { path: path.to_path_buf(), source })
}

pub fn load_policy_file(
    path: &Path,
) -> Result<(PolicyTable, ExtensionTable, TitleRankTable), LoadError> {
    let raw = read_file(path)?;
    parse_policy(&raw).map_err(|error| match error {
        PolicyParseError::Toml(source) => LoadError::ParsePolicy { path: path.to_path_buf(), source },
        PolicyParseError::Load(error) => error,
    })
}

enum PolicyParseError {
    Toml(toml::de::Error),
    Load(LoadError),
}

fn parse_policy(raw: &str) -> Result<(PolicyTable, ExtensionTable, TitleRankTable), PolicyParseError> {
    let file: PolicyFile = toml::from_str(raw).map_err(PolicyParseError::Toml)?;

    let tiers = file
        .tiers
        .into_iter()
        .map(|tier| {
            Ok(ApprovalPolicyTier {
                id: tier.id,
                min_amount: tier.min_amount,
                max_amount: tier.max_amount,
                risk_level: tier.risk_level,
                requirements: convert_requirements(tier.requirements)?,
                description: tier.description,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()
        .map_err(PolicyParseError::Load)?;

    let extensions = file
        .extensions
        .into_iter()
        .map(|extension| {
            Ok(SpecialCaseExtension {
                transaction_type: extension.transaction_type,
                additional_roles: convert_requirements(extension.additional_roles)?,
                description: extension.description,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()
        .map_err(PolicyParseError::Load)?;

    let title_ranks = match file.title_ranks {
        Some(entries) => TitleRankTable::new(
            entries.into_iter().map(|entry| TitleRank { title: entry.title, rank: entry.rank }).collect(),
        ),
        None => fixtures::reference_title_ranks(),
    };

    Ok((PolicyTable::new(tiers), ExtensionTable::new(extensions), title_ranks))
}

fn convert_requirements(rows: Vec<RequirementRow>) -> Result<Vec<ApprovalRequirement>, LoadError> {
    rows.into_iter()
        .map(|row| {
            let role = Role::from_str(&row.role).map_err(|_| LoadError::InvalidRole {
                requirement: row.description.clone(),
                role: row.role.clone(),
            })?;
            Ok(ApprovalRequirement {
                role,
                department: row.department,
                fallback_departments: row.fallback_departments,
                count: row.count,
                priority: row.priority,
                description: row.description,
            })
        })
        .collect()
}

pub fn load_rates_file(path: &Path) -> Result<RateTable, LoadError> {
    let raw = read_file(path)?;
    let file: RatesFile = toml::from_str(&raw)
        .map_err(|source| LoadError::ParseRates { path: path.to_path_buf(), source })?;

    let reference = Currency::from_str(&file.reference)
        .map_err(|_| LoadError::UnknownCurrency { path: path.to_path_buf(), code: file.reference.clone() })?;

    let mut rates = BTreeMap::new();
    for (code, value) in file.rates {
        let currency = Currency::from_str(&code)
            .map_err(|_| LoadError::UnknownCurrency { path: path.to_path_buf(), code: code.clone() })?;
        let rate = value.to_decimal().filter(|rate| !rate.is_sign_negative()).ok_or_else(|| {
            LoadError::InvalidRate { code: code.clone(), value: value.to_string() }
        })?;
        rates.insert(currency, rate);
    }

    Ok(RateTable::new(reference, rates))
}

pub fn load_roster_file(path: &Path) -> Result<Vec<RosterRecord>, LoadError> {
    let raw = read_file(path)?;
    serde_json::from_str(&raw)
        .map_err(|source| LoadError::ParseRoster { path: path.to_path_buf(), source })
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    tiers: Vec<TierRow>,
    #[serde(default)]
    extensions: Vec<ExtensionRow>,
    title_ranks: Option<Vec<TitleRankRow>>,
}

#[derive(Debug, Deserialize)]
struct TierRow {
    id: String,
    min_amount: u64,
    max_amount: Option<u64>,
    risk_level: RiskLevel,
    #[serde(default)]
    description: String,
    #[serde(default)]
    requirements: Vec<RequirementRow>,
}

#[derive(Debug, Deserialize)]
struct RequirementRow {
    role: String,
    department: Option<String>,
    #[serde(default)]
    fallback_departments: Vec<String>,
    count: u32,
    priority: i32,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ExtensionRow {
    transaction_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    additional_roles: Vec<RequirementRow>,
}

#[derive(Debug, Deserialize)]
struct TitleRankRow {
    title: String,
    rank: u8,
}

#[derive(Debug, Deserialize)]
struct RatesFile {
    reference: String,
    #[serde(default)]
    rates: BTreeMap<String, RateValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RateValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RateValue {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(value) => Some(Decimal::from(*value)),
            Self::Float(value) => Decimal::from_f64(*value),
            Self::Text(value) => Decimal::from_str(value.trim()).ok(),
        }
    }
}

impl std::fmt::Display for RateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{load_rates_file, load_snapshot, LoadError};
    use crate::config::PolicyDataConfig;
    use crate::currency::Currency;
    use crate::domain::candidate::Role;
    use crate::domain::policy::{PolicyError, RiskLevel};

    const POLICY: &str = r#"
[[tiers]]
id = "small"
min_amount = 0
max_amount = 5000
risk_level = "low"
description = "small transfers"

[[tiers.requirements]]
role = "approver"
department = "Finance"
count = 1
priority = 1
description = "Finance approval"

[[tiers]]
id = "large"
min_amount = 5000
risk_level = "very_high"
description = "large transfers"

[[tiers.requirements]]
role = "operator"
department = "Risk"
fallback_departments = ["Security"]
count = 2
priority = 1
description = "Risk review"

[[extensions]]
transaction_type = "emergency"

[[extensions.additional_roles]]
role = "admin"
count = 1
priority = 0
description = "Emergency authorization"

[[title_ranks]]
title = "Head of Desk"
rank = 1
"#;

    fn write(dir: &TempDir, name: &str, contents: &str) -> Result<std::path::PathBuf, String> {
        let path = dir.path().join(name);
        fs::write(&path, contents).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn unset_paths_fall_back_to_reference_data() -> Result<(), String> {
        let loaded = load_snapshot(&PolicyDataConfig::default()).map_err(|err| err.to_string())?;

        assert_eq!(loaded.snapshot.policy.tiers().len(), 5);
        assert_eq!(loaded.snapshot.roster.len(), 13);
        assert!(loaded.roster_issues.is_empty());
        assert_eq!(loaded.sources.policy, "built-in reference");
        Ok(())
    }

    #[test]
    fn policy_rates_and_roster_files_are_loaded() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let policy_path = write(&dir, "policy.toml", POLICY)?;
        let rates_path = write(
            &dir,
            "rates.toml",
            "reference = \"KRW\"\n[rates]\nBTC = \"90000000.5\"\nusdt = 1350\nETH = 4500000.0\n",
        )?;
        let roster_path = write(
            &dir,
            "roster.json",
            r#"[
                {"id": "u-1", "name": "Ana", "role": "admin", "status": "active", "position": "Head of Desk"},
                {"id": "u-2", "name": "Ben", "role": "auditor", "status": "active"}
            ]"#,
        )?;

        let loaded = load_snapshot(&PolicyDataConfig {
            policy_path: Some(policy_path),
            rates_path: Some(rates_path),
            roster_path: Some(roster_path),
        })
        .map_err(|err| err.to_string())?;

        let snapshot = &loaded.snapshot;
        assert_eq!(snapshot.policy.tiers()[0].requirements[0].role, Role::Manager);
        assert_eq!(snapshot.policy.tiers()[1].risk_level, RiskLevel::VeryHigh);
        assert_eq!(snapshot.policy.tiers()[1].max_amount, None);
        assert!(snapshot.extensions.get("EMERGENCY").is_some());
        assert_eq!(snapshot.title_ranks.rank_for("head of desk"), Some(1));
        assert_eq!(snapshot.rates.rate(Currency::Btc), Some(Decimal::new(900_000_005, 1)));
        assert_eq!(snapshot.rates.rate(Currency::Usdt), Some(Decimal::new(1_350, 0)));
        assert_eq!(snapshot.rates.rate(Currency::Sol), None);
        assert_eq!(snapshot.roster.len(), 1);
        assert_eq!(loaded.roster_issues.len(), 1);
        assert_eq!(loaded.roster_issues[0].record_id, "u-2");
        Ok(())
    }

    #[test]
    fn policy_file_with_gap_is_rejected() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let gapped = POLICY.replace("min_amount = 5000", "min_amount = 6000");
        let policy_path = write(&dir, "policy.toml", &gapped)?;

        let error = load_snapshot(&PolicyDataConfig {
            policy_path: Some(policy_path),
            ..PolicyDataConfig::default()
        })
        .err()
        .ok_or_else(|| "gap should fail validation".to_string())?;

        assert!(matches!(error, LoadError::Policy(PolicyError::Gap { .. })));
        Ok(())
    }

    #[test]
    fn unknown_requirement_role_is_rejected() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let policy_path = write(&dir, "policy.toml", &POLICY.replace("\"approver\"", "\"auditor\""))?;

        let error = load_snapshot(&PolicyDataConfig {
            policy_path: Some(policy_path),
            ..PolicyDataConfig::default()
        })
        .err()
        .ok_or_else(|| "unknown role should fail".to_string())?;

        assert!(matches!(error, LoadError::InvalidRole { ref role, .. } if role == "auditor"));
        Ok(())
    }

    #[test]
    fn rates_file_rejects_unknown_codes_and_negative_rates() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;

        let unknown = write(&dir, "unknown.toml", "reference = \"KRW\"\n[rates]\nDOGE = 100\n")?;
        assert!(matches!(
            load_rates_file(&unknown),
            Err(LoadError::UnknownCurrency { ref code, .. }) if code == "DOGE"
        ));

        let negative = write(&dir, "negative.toml", "reference = \"KRW\"\n[rates]\nBTC = -1\n")?;
        assert!(matches!(load_rates_file(&negative), Err(LoadError::InvalidRate { .. })));
        Ok(())
    }
}

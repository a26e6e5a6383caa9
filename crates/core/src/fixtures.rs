//! Reference configuration used when no data files are configured, and by
//! tests. Amounts are in KRW.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::currency::{Currency, RateTable};
use crate::domain::candidate::{Roster, RosterRecord, Role};
use crate::domain::policy::{
    ApprovalPolicyTier, ApprovalRequirement, ExtensionTable, PolicyTable, RiskLevel,
    SpecialCaseExtension, TitleRank, TitleRankTable,
};
use crate::snapshot::EngineSnapshot;

const ONE_MILLION: u64 = 1_000_000;
const TEN_MILLION: u64 = 10_000_000;
const HUNDRED_MILLION: u64 = 100_000_000;
const ONE_BILLION: u64 = 1_000_000_000;

fn finance_manager(count: u32) -> ApprovalRequirement {
    ApprovalRequirement {
        role: Role::Manager,
        department: Some("Finance".to_string()),
        fallback_departments: Vec::new(),
        count,
        priority: 2,
        description: "Finance manager approval".to_string(),
    }
}

fn risk_operator() -> ApprovalRequirement {
    ApprovalRequirement {
        role: Role::Operator,
        department: Some("Risk".to_string()),
        fallback_departments: vec!["Security".to_string()],
        count: 1,
        priority: 3,
        description: "Risk review".to_string(),
    }
}

fn tech_manager() -> ApprovalRequirement {
    ApprovalRequirement {
        role: Role::Manager,
        department: Some("Tech".to_string()),
        fallback_departments: vec!["IT".to_string()],
        count: 1,
        priority: 4,
        description: "Technical custody sign-off".to_string(),
    }
}

fn compliance_operator() -> ApprovalRequirement {
    ApprovalRequirement {
        role: Role::Operator,
        department: Some("Compliance".to_string()),
        fallback_departments: Vec::new(),
        count: 1,
        priority: 5,
        description: "Compliance check".to_string(),
    }
}

fn executive_admin() -> ApprovalRequirement {
    ApprovalRequirement {
        role: Role::Admin,
        department: None,
        fallback_departments: Vec::new(),
        count: 1,
        priority: 6,
        description: "Executive authorization".to_string(),
    }
}

pub fn reference_policy_table() -> PolicyTable {
    PolicyTable::new(vec![
        ApprovalPolicyTier {
            id: "tier_under_1m".to_string(),
            min_amount: 0,
            max_amount: Some(ONE_MILLION),
            risk_level: RiskLevel::Low,
            requirements: vec![finance_manager(1), risk_operator()],
            description: "under 1,000,000".to_string(),
        },
        ApprovalPolicyTier {
            id: "tier_1m_10m".to_string(),
            min_amount: ONE_MILLION,
            max_amount: Some(TEN_MILLION),
            risk_level: RiskLevel::Medium,
            requirements: vec![finance_manager(1), risk_operator(), tech_manager()],
            description: "1,000,000 - 10,000,000".to_string(),
        },
        ApprovalPolicyTier {
            id: "tier_10m_100m".to_string(),
            min_amount: TEN_MILLION,
            max_amount: Some(HUNDRED_MILLION),
            risk_level: RiskLevel::High,
            requirements: vec![
                finance_manager(1),
                risk_operator(),
                tech_manager(),
                compliance_operator(),
            ],
            description: "10,000,000 - 100,000,000".to_string(),
        },
        ApprovalPolicyTier {
            id: "tier_100m_1b".to_string(),
            min_amount: HUNDRED_MILLION,
            max_amount: Some(ONE_BILLION),
            risk_level: RiskLevel::VeryHigh,
            requirements: vec![
                finance_manager(1),
                risk_operator(),
                tech_manager(),
                compliance_operator(),
                executive_admin(),
            ],
            description: "100,000,000 - 1,000,000,000".to_string(),
        },
        ApprovalPolicyTier {
            id: "tier_1b_plus".to_string(),
            min_amount: ONE_BILLION,
            max_amount: None,
            risk_level: RiskLevel::Critical,
            requirements: vec![
                finance_manager(2),
                risk_operator(),
                tech_manager(),
                compliance_operator(),
                executive_admin(),
            ],
            description: "1,000,000,000+".to_string(),
        },
    ])
}

pub fn reference_extensions() -> ExtensionTable {
    ExtensionTable::new(vec![
        SpecialCaseExtension {
            transaction_type: "cross_border".to_string(),
            additional_roles: vec![ApprovalRequirement {
                role: Role::Operator,
                department: Some("Compliance".to_string()),
                fallback_departments: Vec::new(),
                count: 1,
                priority: 10,
                description: "Cross-border compliance review".to_string(),
            }],
            description: "transfers leaving the domestic jurisdiction".to_string(),
        },
        SpecialCaseExtension {
            transaction_type: "institutional".to_string(),
            additional_roles: vec![ApprovalRequirement {
                role: Role::Manager,
                department: Some("Operations".to_string()),
                fallback_departments: Vec::new(),
                count: 1,
                priority: 11,
                description: "Institutional client desk approval".to_string(),
            }],
            description: "institutional client transfers".to_string(),
        },
        SpecialCaseExtension {
            transaction_type: "emergency".to_string(),
            additional_roles: vec![ApprovalRequirement {
                role: Role::Admin,
                department: None,
                fallback_departments: Vec::new(),
                count: 1,
                priority: 1,
                description: "Emergency authorization".to_string(),
            }],
            description: "emergency withdrawals resolved ahead of tier requirements".to_string(),
        },
    ])
}

pub fn reference_title_ranks() -> TitleRankTable {
    let mut entries = vec![TitleRank { title: "CEO".to_string(), rank: 1 }];
    entries.extend(
        ["CFO", "CTO", "COO", "CISO", "CCO"]
            .into_iter()
            .map(|title| TitleRank { title: title.to_string(), rank: 2 }),
    );
    TitleRankTable::new(entries)
}

pub fn reference_rates() -> RateTable {
    RateTable::new(
        Currency::Krw,
        BTreeMap::from([
            (Currency::Usd, Decimal::new(1_350, 0)),
            (Currency::Usdt, Decimal::new(1_350, 0)),
            (Currency::Usdc, Decimal::new(1_350, 0)),
            (Currency::Btc, Decimal::new(90_000_000, 0)),
            (Currency::Eth, Decimal::new(4_500_000, 0)),
            (Currency::Sol, Decimal::new(200_000, 0)),
            (Currency::Xrp, Decimal::new(3_000, 0)),
        ]),
    )
}

pub fn demo_roster_records() -> Vec<RosterRecord> {
    let row = |id: &str, name: &str, role: &str, department: &str, status: &str, position: &str| {
        RosterRecord {
            id: id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            department: Some(department.to_string()),
            status: status.to_string(),
            position: Some(position.to_string()),
            rank: None,
        }
    };

    vec![
        row("emp-001", "Kim Minjun", "admin", "Executive", "active", "CEO"),
        row("emp-002", "Lee Seoyeon", "manager", "Finance", "active", "CFO"),
        row("emp-003", "Park Jiho", "approver", "Finance", "inactive", "Finance Lead"),
        row("emp-004", "Choi Yuna", "manager", "Finance", "pending", "Accountant"),
        row("emp-005", "Jung Hayoon", "operator", "Risk", "active", "Risk Analyst"),
        row("emp-006", "Kang Doyun", "operator", "Security", "active", "Security Engineer"),
        row("emp-007", "Yoon Seojun", "manager", "Tech", "active", "CTO"),
        row("emp-008", "Lim Jiwoo", "manager", "IT", "active", "IT Manager"),
        row("emp-009", "Han Eunji", "operator", "Compliance", "active", "Compliance Officer"),
        row("emp-010", "Shin Woojin", "manager", "Operations", "active", "COO"),
        row("emp-011", "Oh Sumin", "admin", "Security", "active", "Security Admin"),
        row("emp-012", "Seo Jihun", "viewer", "Finance", "active", "Analyst"),
        row("emp-013", "Kwon Nari", "initiator", "Operations", "active", "Treasury Operator"),
    ]
}

pub fn demo_roster() -> Roster {
    Roster::ingest(demo_roster_records()).0
}

pub fn reference_snapshot() -> EngineSnapshot {
    EngineSnapshot::new(
        demo_roster(),
        reference_policy_table(),
        reference_extensions(),
        reference_rates(),
        reference_title_ranks(),
    )
}

#[cfg(test)]
mod tests {
    use super::{demo_roster_records, reference_extensions, reference_policy_table};
    use crate::domain::candidate::Roster;

    #[test]
    fn reference_configuration_is_valid() {
        assert_eq!(reference_policy_table().validate(), Ok(()));
        assert_eq!(reference_extensions().validate(), Ok(()));
    }

    #[test]
    fn demo_roster_ingests_without_issues() {
        let (roster, issues) = Roster::ingest(demo_roster_records());
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
        assert_eq!(roster.len(), 13);
    }
}

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use approvals_core::fixtures;
use approvals_core::{
    ApprovalPolicyTier, ApprovalRequirement, ApproverSelector, Currency, PolicyMatchResult,
    PolicyTable, RateTable, RiskLevel, Role,
};
use rust_decimal::Decimal;

const PROBE_AMOUNTS: [i64; 9] = [
    0,
    500_000,
    999_999,
    1_000_000,
    5_000_000,
    50_000_000,
    100_000_000,
    999_999_999,
    2_000_000_000,
];

const TRANSACTION_TYPES: [Option<&str>; 5] =
    [None, Some("cross_border"), Some("institutional"), Some("emergency"), Some("unregistered")];

fn reference_selector() -> ApproverSelector {
    ApproverSelector::new(Arc::new(fixtures::reference_snapshot()))
}

fn evaluate(selector: &ApproverSelector, amount: i64, transaction_type: Option<&str>) -> PolicyMatchResult {
    selector
        .select_approvers(Decimal::new(amount, 0), Currency::Krw, transaction_type)
        .expect("evaluation should succeed")
}

#[test]
fn scenario_small_transfer_selects_finance_and_risk() {
    let result = evaluate(&reference_selector(), 500_000, None);

    assert_eq!(result.tier.id, "tier_under_1m");
    assert_eq!(result.selected_approvers.len(), 2);

    let finance = &result.selected_approvers[0];
    assert_eq!(finance.role, Role::Manager);
    assert_eq!(finance.department.as_deref(), Some("Finance"));

    let risk = &result.selected_approvers[1];
    assert_eq!(risk.role, Role::Operator);
    assert!(matches!(risk.department.as_deref(), Some("Risk") | Some("Security")));
    assert!(result.missing_requirements.is_empty());
}

#[test]
fn scenario_high_tier_staffs_four_departments() {
    let result = evaluate(&reference_selector(), 50_000_000, None);

    assert_eq!(result.tier.id, "tier_10m_100m");
    assert_eq!(result.tier.risk_level, RiskLevel::High);

    let staffed: Vec<(Role, Option<&str>)> = result
        .selected_approvers
        .iter()
        .map(|approver| (approver.role, approver.department.as_deref()))
        .collect();
    assert_eq!(
        staffed,
        vec![
            (Role::Manager, Some("Finance")),
            (Role::Operator, Some("Risk")),
            (Role::Manager, Some("Tech")),
            (Role::Operator, Some("Compliance")),
        ]
    );
    assert!(result.missing_requirements.is_empty());
    assert!(result.warnings.is_empty());
}

#[test]
fn scenario_critical_tier_reports_finance_shortfall() {
    let result = evaluate(&reference_selector(), 2_000_000_000, None);

    assert_eq!(result.tier.id, "tier_1b_plus");
    let finance: Vec<&str> = result
        .selected_approvers
        .iter()
        .filter(|approver| approver.department.as_deref() == Some("Finance"))
        .map(|approver| approver.id.as_str())
        .collect();
    assert_eq!(finance, vec!["emp-002"]);

    assert_eq!(result.missing_requirements.len(), 1);
    assert_eq!(result.missing_requirements[0].count, 2);
    assert_eq!(result.missing_requirements[0].department.as_deref(), Some("Finance"));
    assert_eq!(result.warnings, vec!["Finance manager approval: need 2, found 1".to_string()]);
    assert!(!result.is_fully_staffed());
}

#[test]
fn scenario_emergency_admin_resolves_first_and_is_excluded_later() {
    let result = evaluate(&reference_selector(), 500_000_000, Some("emergency"));

    let emergency = &result.selected_approvers[0];
    assert_eq!(emergency.id, "emp-001");
    assert_eq!(emergency.priority, 1);
    assert!(emergency.reason.starts_with("Emergency authorization"));

    let tier_admins: Vec<&str> = result
        .selected_approvers
        .iter()
        .skip(1)
        .filter(|approver| approver.role == Role::Admin)
        .map(|approver| approver.id.as_str())
        .collect();
    assert_eq!(tier_admins, vec!["emp-011"]);
    assert!(result.missing_requirements.is_empty());
}

#[test]
fn scenario_missing_rate_routes_to_lowest_tier_with_warning() {
    let mut snapshot = fixtures::reference_snapshot();
    snapshot.rates = RateTable::new(
        Currency::Krw,
        BTreeMap::from([(Currency::Btc, Decimal::new(90_000_000, 0))]),
    );
    let selector = ApproverSelector::new(Arc::new(snapshot));

    let result = selector
        .select_approvers(Decimal::new(10, 0), Currency::Sol, None)
        .expect("missing rate must not fail the evaluation");

    assert_eq!(result.tier.id, "tier_under_1m");
    assert!(result.warnings.iter().any(|warning| warning.contains("no exchange rate for SOL")));
    assert_eq!(result.selected_approvers.len(), 2);
}

#[test]
fn repeated_evaluations_are_identical() {
    let selector = reference_selector();

    for amount in PROBE_AMOUNTS {
        for transaction_type in TRANSACTION_TYPES {
            let first = evaluate(&selector, amount, transaction_type);
            let second = evaluate(&selector, amount, transaction_type);
            assert_eq!(first, second, "amount {amount} {transaction_type:?} was not deterministic");
        }
    }
}

#[test]
fn no_candidate_is_selected_twice() {
    let selector = reference_selector();

    for amount in PROBE_AMOUNTS {
        for transaction_type in TRANSACTION_TYPES {
            let result = evaluate(&selector, amount, transaction_type);
            let ids = result.approver_ids();
            let unique: HashSet<&str> = ids.iter().copied().collect();
            assert_eq!(unique.len(), ids.len(), "duplicate approver at {amount} {transaction_type:?}");
        }
    }
}

#[test]
fn head_count_is_bounded_and_shortfalls_are_reported() {
    let selector = reference_selector();

    for amount in PROBE_AMOUNTS {
        for transaction_type in TRANSACTION_TYPES {
            let result = evaluate(&selector, amount, transaction_type);

            let mut per_priority: HashMap<i32, u32> = HashMap::new();
            for approver in &result.selected_approvers {
                *per_priority.entry(approver.priority).or_default() += 1;
            }

            let mut requirements = result.tier.requirements.clone();
            if let Some(extension) =
                transaction_type.and_then(|kind| selector.snapshot().extensions.get(kind))
            {
                requirements.extend(extension.additional_roles.iter().cloned());
            }

            for requirement in &requirements {
                let staffed = per_priority.get(&requirement.priority).copied().unwrap_or(0);
                assert!(staffed <= requirement.count, "{} over-staffed", requirement.description);
                if staffed < requirement.count {
                    assert!(
                        result.missing_requirements.contains(requirement),
                        "{} short but not reported",
                        requirement.description
                    );
                }
            }
        }
    }
}

#[test]
fn resolved_first_requirement_wins_contested_candidate() {
    let mut snapshot = fixtures::reference_snapshot();
    snapshot.policy = PolicyTable::new(vec![ApprovalPolicyTier {
        id: "contested".to_string(),
        min_amount: 0,
        max_amount: None,
        risk_level: RiskLevel::Medium,
        requirements: vec![
            ApprovalRequirement {
                role: Role::Manager,
                department: Some("Finance".to_string()),
                fallback_departments: Vec::new(),
                count: 1,
                priority: 5,
                description: "Finance manager".to_string(),
            },
            ApprovalRequirement {
                role: Role::Manager,
                department: None,
                fallback_departments: Vec::new(),
                count: 1,
                priority: 1,
                description: "Any manager".to_string(),
            },
        ],
        description: "contested".to_string(),
    }]);

    let result = ApproverSelector::new(Arc::new(snapshot))
        .select_approvers(Decimal::new(1, 0), Currency::Krw, None)
        .expect("evaluation should succeed");

    let cfo = result
        .selected_approvers
        .iter()
        .find(|approver| approver.id == "emp-002")
        .expect("the CFO should be selected");
    assert_eq!(cfo.priority, 1);
    assert_eq!(result.missing_requirements.len(), 1);
    assert_eq!(result.missing_requirements[0].description, "Finance manager");
    assert_eq!(result.warnings, vec!["Finance manager: need 1, found 0".to_string()]);
}

#[test]
fn converted_crypto_amounts_match_exactly_one_tier() {
    let selector = reference_selector();
    let cases = [
        (Decimal::new(1, 2), Currency::Btc, "tier_under_1m"),
        (Decimal::new(5, 0), Currency::Eth, "tier_10m_100m"),
        (Decimal::new(100_000, 0), Currency::Usdt, "tier_100m_1b"),
        (Decimal::new(20, 0), Currency::Btc, "tier_1b_plus"),
    ];

    for (amount, currency, expected) in cases {
        let result = selector
            .select_approvers(amount, currency, None)
            .expect("evaluation should succeed");
        assert_eq!(result.tier.id, expected, "{amount} {currency}");
    }
}

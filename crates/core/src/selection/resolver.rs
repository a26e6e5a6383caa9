use std::collections::HashSet;

use tracing::trace;

use crate::domain::candidate::{ApproverCandidate, Role};
use crate::domain::policy::{ApprovalRequirement, TitleRankTable};
use crate::domain::result::SelectedApprover;

const DEFAULT_RANK: u8 = 10;

/// Selection rank, lower first: explicit `rank`, then the title table, then
/// the role default.
pub fn candidate_rank(candidate: &ApproverCandidate, ranks: &TitleRankTable) -> u8 {
    if let Some(rank) = candidate.rank {
        return rank;
    }
    if let Some(rank) = candidate.position.as_deref().and_then(|title| ranks.rank_for(title)) {
        return rank;
    }
    match candidate.role {
        Role::Manager => 3,
        Role::Operator => 4,
        Role::Admin => 5,
        Role::Viewer => DEFAULT_RANK,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DepartmentMatch {
    Primary,
    Fallback,
}

fn department_match(
    candidate: &ApproverCandidate,
    requirement: &ApprovalRequirement,
) -> Option<DepartmentMatch> {
    let Some(primary) = requirement.department.as_deref() else {
        return Some(DepartmentMatch::Primary);
    };
    if candidate.in_department(primary) {
        return Some(DepartmentMatch::Primary);
    }
    requirement
        .fallback_departments
        .iter()
        .any(|fallback| candidate.in_department(fallback))
        .then_some(DepartmentMatch::Fallback)
}

/// Picks up to `requirement.count` approvers for one requirement.
///
/// Fallback-department candidates only fill slots the primary department
/// cannot. A short result is not an error; the caller reports the shortfall.
pub fn resolve(
    requirement: &ApprovalRequirement,
    roster: &[ApproverCandidate],
    excluded: &HashSet<String>,
    ranks: &TitleRankTable,
) -> Vec<SelectedApprover> {
    let mut eligible: Vec<(DepartmentMatch, u8, &ApproverCandidate)> = roster
        .iter()
        .filter(|candidate| candidate.is_active())
        .filter(|candidate| candidate.role == requirement.role)
        .filter(|candidate| !excluded.contains(&candidate.id))
        .filter_map(|candidate| {
            department_match(candidate, requirement)
                .map(|matched| (matched, candidate_rank(candidate, ranks), candidate))
        })
        .collect();

    // sort_by_key is stable: roster order survives within a rank
    eligible.sort_by_key(|(matched, rank, _)| (*matched, *rank));

    trace!(
        event_name = "engine.selection.candidates_ranked",
        requirement = %requirement.description,
        eligible = eligible.len(),
        "ranked eligible candidates"
    );

    eligible
        .into_iter()
        .take(requirement.count as usize)
        .map(|(_, _, candidate)| SelectedApprover {
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            role: candidate.role,
            department: candidate.department.clone(),
            priority: requirement.priority,
            is_auto_selected: true,
            reason: selection_reason(requirement, candidate),
        })
        .collect()
}

fn selection_reason(requirement: &ApprovalRequirement, candidate: &ApproverCandidate) -> String {
    let detail: Vec<&str> =
        [candidate.department.as_deref(), candidate.position.as_deref()].into_iter().flatten().collect();
    if detail.is_empty() {
        requirement.description.clone()
    } else {
        format!("{} ({})", requirement.description, detail.join(" "))
    }
}

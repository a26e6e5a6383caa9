use tracing::debug;

use crate::domain::policy::ApprovalPolicyTier;

/// Returns the first tier, in table order, whose `[min, max)` range contains
/// `amount`.
///
/// The table is scanned in full and never re-sorted; ordering and
/// non-overlap are the table author's responsibility (checked once at load
/// time by `PolicyTable::validate`).
pub fn match_tier(amount: u64, tiers: &[ApprovalPolicyTier]) -> Option<&ApprovalPolicyTier> {
    let matched = tiers.iter().find(|tier| tier.contains(amount));
    debug!(
        event_name = "engine.policy.tier_matched",
        amount,
        tier_id = matched.map(|tier| tier.id.as_str()).unwrap_or("none"),
        "policy tier lookup"
    );
    matched
}

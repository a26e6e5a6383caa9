pub mod config;
pub mod currency;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod loader;
pub mod policy;
pub mod selection;
pub mod snapshot;
pub mod throttle;

pub use currency::{Conversion, ConversionWarning, Currency, RateTable, UnsupportedCurrency};
pub use domain::candidate::{ApproverCandidate, CandidateStatus, IngestIssue, Role, Roster, RosterRecord};
pub use domain::policy::{
    ApprovalPolicyTier, ApprovalRequirement, ExtensionTable, PolicyError, PolicyTable, RiskLevel,
    SpecialCaseExtension, TitleRank, TitleRankTable,
};
pub use domain::result::{PolicyMatchResult, SelectedApprover};
pub use errors::{ApplicationError, EngineError, InterfaceError};
pub use loader::{load_snapshot, LoadError, LoadedSnapshot};
pub use selection::ApproverSelector;
pub use snapshot::{EngineSnapshot, SnapshotStore};
pub use throttle::{ResendState, ResendThrottle, ThrottleDecision};

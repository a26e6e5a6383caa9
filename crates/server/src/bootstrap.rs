use std::sync::Arc;

use approvals_core::config::AppConfig;
use approvals_core::loader::{load_snapshot, LoadError};
use approvals_core::SnapshotStore;
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<SnapshotStore>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("policy data failed to load: {0}")]
    Data(#[from] LoadError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let loaded = load_snapshot(&config.policy)?;
    for issue in &loaded.roster_issues {
        warn!(
            event_name = "system.bootstrap.roster_issue",
            correlation_id = "bootstrap",
            record_id = %issue.record_id,
            reason = %issue.reason,
            "roster record skipped"
        );
    }
    info!(
        event_name = "system.bootstrap.snapshot_ready",
        correlation_id = "bootstrap",
        policy_source = %loaded.sources.policy,
        rates_source = %loaded.sources.rates,
        roster_source = %loaded.sources.roster,
        "engine snapshot ready"
    );

    Ok(Application { config, store: Arc::new(SnapshotStore::new(loaded.snapshot)) })
}

/// Re-reads the data files and swaps them in. On failure the previous snapshot
/// keeps serving.
pub fn reload(config: &AppConfig, store: &SnapshotStore) -> Result<(), LoadError> {
    let loaded = load_snapshot(&config.policy)?;
    let tiers = loaded.snapshot.policy.tiers().len();
    let roster_size = loaded.snapshot.roster.len();
    store.replace(loaded.snapshot);

    info!(
        event_name = "system.snapshot.reloaded",
        correlation_id = "reload",
        tiers,
        roster_size,
        "engine snapshot replaced"
    );
    Ok(())
}

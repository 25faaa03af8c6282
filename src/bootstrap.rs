use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

use crate::{
    api::handler::AppState,
    config::{Config, MAX_AMOUNT},
    error::AppResult,
    funding::{AccountFactory, FundingService},
    ledger::{
        client::{LedgerQuery, RippledClient},
        models::{ASF_DEFAULT_RIPPLE, LSF_DEFAULT_RIPPLE},
    },
    sequence::{DriftObserver, LogDriftObserver, Reconciler, SequenceAllocator},
    stats::ThroughputStats,
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("initializing application components");

    let client = Arc::new(RippledClient::new(
        config.rippled_url.clone(),
        config.funding_address.clone(),
        config.funding_secret.clone(),
        config.request_timeout(),
    )?);
    info!(url = %config.rippled_url, "ledger client configured");

    let observer: Arc<dyn DriftObserver> = Arc::new(LogDriftObserver);
    let reconciler = Reconciler::new(
        client.clone(),
        config.funding_address.clone(),
        observer.clone(),
    );
    let allocator = Arc::new(SequenceAllocator::new(reconciler, observer));

    let funding = Arc::new(FundingService::new(allocator, client.clone()));
    let accounts = Arc::new(AccountFactory::new(
        client.clone(),
        funding.clone(),
        config.new_account_drops.clone(),
        MAX_AMOUNT.to_string(),
        config.request_timeout(),
    ));

    let stats = Arc::new(ThroughputStats::new());
    stats.spawn_reporter(Duration::from_secs(60));
    info!("throughput reporter started (one-minute windows)");

    // Issued currencies only ripple through the funding account when the
    // default-ripple flag is set. Tolerated on failure: the node may simply
    // not be up yet.
    if let Err(err) = ensure_default_ripple(&client).await {
        error!(error = %err, "default-ripple bootstrap failed");
    }

    Ok(AppState {
        config: Arc::new(config.clone()),
        funding,
        accounts,
        stats,
    })
}

/// Runs before the server accepts traffic, so the funding account's sequence
/// is read directly rather than through the allocator.
async fn ensure_default_ripple(client: &RippledClient) -> AppResult<()> {
    info!("checking default-ripple flag");
    let flags = client.fetch_account_flags(client.funding_address()).await?;

    if flags & LSF_DEFAULT_RIPPLE != 0 {
        info!("default-ripple already set");
        return Ok(());
    }

    info!("setting default-ripple on the funding account");
    let snapshot = client
        .fetch_account_snapshot(client.funding_address())
        .await?;
    let outcome = client
        .submit_account_set(ASF_DEFAULT_RIPPLE, snapshot.confirmed_sequence)
        .await?;

    if outcome.consumed_sequence() {
        info!("default-ripple set");
    } else {
        warn!(?outcome, "default-ripple AccountSet was not accepted");
    }
    Ok(())
}

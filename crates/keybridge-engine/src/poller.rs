//! The context poller: a bounded-staleness observer of focus.
//!
//! Every tick it recomputes the active context and, only on change,
//! rebuilds the live mapping table. Remapping tolerates tens of
//! milliseconds of detection lag, which is what makes polling acceptable
//! here; everything latency-critical reads the cells the poller publishes.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    POLL_INTERVAL,
    mapper::{ActionMapper, MappingLookup},
    state::{CandidateCell, ContextCell, LookupCell},
};

/// Run the poll loop until cancelled.
pub(crate) async fn run_poller(
    resolver: mac_focus::Resolver,
    candidates: Arc<CandidateCell>,
    context: Arc<ContextCell>,
    lookup: Arc<LookupCell>,
    mapper: Arc<Mutex<ActionMapper>>,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("context_poller_started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("context_poller_stopped");
                return;
            }
            _ = ticker.tick() => {
                let cands = candidates.snapshot();
                let resolved = resolver.resolve(&cands);
                if resolved != context.current() {
                    info!(context = ?resolved, "context_changed");
                    let table = match &resolved {
                        Some(ctx) => mapper.lock().lookup_for(ctx),
                        None => Arc::new(MappingLookup::new()),
                    };
                    lookup.replace(table);
                    context.set(resolved);
                }
            }
        }
    }
}

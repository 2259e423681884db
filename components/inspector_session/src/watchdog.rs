//! Advisory watchdog
//!
//! Periodically checks whether any event has reached the session. It only logs; record state is
//! never touched.

use crate::session::Shared;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub(crate) fn spawn(shared: Arc<Shared>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let counters = shared.counters();
            if counters.events_received == 0 {
                warn!(
                    "No network events received after {:?}; is the debugger attached?",
                    interval
                );
                continue;
            }

            let reducer = shared.reducer.read();
            let diagnostics = reducer.diagnostics();
            debug!(
                "Inspector summary: {} requests, {} events, {} redirects, {} duplicates, {} ignored, {} skipped while paused, {} from other tabs",
                reducer.store().len(),
                diagnostics.events_received,
                diagnostics.redirects,
                diagnostics.distinct_duplicate_ids(),
                diagnostics.ignored_urls,
                counters.skipped_paused,
                counters.skipped_other_tab
            );
        }
    })
}

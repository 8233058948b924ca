//! Background sweep for abandoned route drafts.
//!
//! Navigation sessions shut themselves down after an idle timeout, but a
//! draft has no owning task to do the same. This loop discards any draft
//! that has gone a full idle timeout without being touched.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;
use uuid::Uuid;

use crate::state::AppState;

pub async fn run_draft_reaper(state: Arc<AppState>) {
    let timeout = state.engine.draft_idle_timeout;
    let cadence = (timeout / 4).max(Duration::from_millis(50));
    info!(timeout_secs = timeout.as_secs(), "draft reaper started");

    loop {
        sleep(cadence).await;
        sweep(&state, timeout);
    }
}

fn sweep(state: &AppState, timeout: Duration) {
    let expired: Vec<Uuid> = state
        .drafts
        .iter()
        .filter(|entry| entry.value().last_touched.elapsed() >= timeout)
        .map(|entry| *entry.key())
        .collect();

    for id in expired {
        // A touch can land between the scan and the remove.
        let removed = state
            .drafts
            .remove_if(&id, |_, session| session.last_touched.elapsed() >= timeout);
        if removed.is_some() {
            state
                .metrics
                .open_route_drafts
                .set(state.drafts.len() as i64);
            info!(draft_id = %id, "idle route draft discarded");
        }
    }
}

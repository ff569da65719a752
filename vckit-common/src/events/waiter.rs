use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::types::{EntityRef, Event, EventFilter};
use crate::error::VcError;

/// Capability that can execute a query returning events matching a filter.
///
/// Implemented by [`crate::vsphere::VsphereClient`] and by mocks in tests.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;
}

/// Knobs for [`wait_for_event`]. Defaults match the CLI defaults: query every
/// 60 seconds, give up after 300.
pub struct WaitOptions {
    pub interval: Duration,
    pub timeout: Duration,
    /// Aborts the wait early with [`VcError::Cancelled`]. The default token
    /// never fires.
    pub cancel: CancellationToken,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(300),
            cancel: CancellationToken::new(),
        }
    }
}

impl WaitOptions {
    pub fn new(interval_secs: u64, timeout_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            timeout: Duration::from_secs(timeout_secs),
            ..Self::default()
        }
    }
}

/// Poll `source` until an event of type `event_type_id` appears for `entity`,
/// or the timeout budget is exhausted.
///
/// Each pass builds a fresh filter scoped to the entity itself (no
/// descendants) and queries once. A non-empty result returns immediately with
/// every event from that pass, in the order the source returned them. An
/// empty result invokes `on_tick` (the CLI prints a progress dot), sleeps for
/// `interval`, and re-queries. Once the accumulated sleep time reaches the
/// timeout the wait fails without issuing another query.
///
/// The timeout is coarse-grained on purpose: elapsed time advances by whole
/// intervals, so when the timeout is not a multiple of the interval the last
/// sleep overshoots it by up to `interval - 1` seconds. Time spent inside the
/// query call itself is not counted.
///
/// Query failures are not retried; they propagate as [`VcError::Api`] and
/// fail the whole wait.
pub async fn wait_for_event<S: EventSource>(
    entity: &EntityRef,
    source: &S,
    event_type_id: &str,
    opts: &WaitOptions,
    mut on_tick: impl FnMut(),
) -> Result<Vec<Event>, VcError> {
    let mut elapsed = Duration::ZERO;

    loop {
        let filter = EventFilter::for_entity(entity, event_type_id);
        let events = source.query_events(&filter).await?;

        if !events.is_empty() {
            debug!(
                vm = %entity.name,
                count = events.len(),
                "matching event(s) found after {}s",
                elapsed.as_secs()
            );
            return Ok(events);
        }

        on_tick();

        tokio::select! {
            () = opts.cancel.cancelled() => return Err(VcError::Cancelled),
            () = tokio::time::sleep(opts.interval) => {}
        }
        elapsed += opts.interval;

        if elapsed >= opts.timeout {
            return Err(VcError::Timeout {
                entity: entity.name.clone(),
                timeout_secs: opts.timeout.as_secs(),
            });
        }
    }
}

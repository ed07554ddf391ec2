//! Restartable-timer debouncer.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::debug;

use super::ReloadRequests;

/// Collapse raw path events into reload requests.
///
/// Every event (re)arms a `window` timer; when it fires with no newer event,
/// one request covering every path seen since the last fire is made. Runs
/// until the event channel closes, flushing anything still pending.
pub async fn debounce(
    mut events: mpsc::UnboundedReceiver<PathBuf>,
    window: Duration,
    requests: Arc<ReloadRequests>,
) {
    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    let timer = sleep(window);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(path) => {
                    pending.insert(path);
                    timer.as_mut().reset(Instant::now() + window);
                }
                None => {
                    if !pending.is_empty() {
                        requests.request(std::mem::take(&mut pending));
                    }
                    debug!("change event channel closed, debouncer exiting");
                    break;
                }
            },
            () = &mut timer, if !pending.is_empty() => {
                let paths = std::mem::take(&mut pending);
                debug!(paths = paths.len(), "change burst settled, requesting reload");
                requests.request(paths);
            }
        }
    }
}

//! Bridge from store change notifications to controller requests.

use sticker_store::Watch;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::controller::ControllerHandle;
use crate::reconciler::Request;

/// Forward every change event of `source` to `handle` until `shutdown`
/// turns true, the store goes away or the controller stops.
///
/// Missed events after a lag are not replayed; a periodic resync covers them.
pub fn forward_events<W: Watch>(
    source: &W,
    handle: ControllerHandle,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut events = source.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = events.recv() => match received {
                    Ok(event) => {
                        if !handle.enqueue(Request::new(event.kind, event.name)) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "watch subscriber lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!("event forwarding stopped");
    })
}

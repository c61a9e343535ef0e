use std::future::Future;
use std::rc::Rc;

use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::lock::Mutex;
use futures::StreamExt;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventSource};

use crate::error::ClientError;

/// Server event name carrying todo changes.
const CHANGE_EVENT: &str = "change";

/// An open change stream. Closing happens on drop.
pub struct ChangeSubscription {
    source: EventSource,
    on_change: Closure<dyn FnMut(Event)>,
    on_open: Closure<dyn FnMut(Event)>,
    changes: Rc<Mutex<UnboundedReceiver<()>>>,
}

impl ChangeSubscription {
    /// Opens the stream. A reconnect after a dropped connection also counts as
    /// a change, since events may have been missed meanwhile.
    pub fn open(url: &str) -> Result<Self, ClientError> {
        let source = EventSource::new(url)
            .map_err(|_| ClientError::Network(format!("failed to open {url}")))?;
        let (tx, rx) = mpsc::unbounded();

        let change_tx = tx.clone();
        let on_change = Closure::wrap(Box::new(move |_event: Event| {
            let _ = change_tx.unbounded_send(());
        }) as Box<dyn FnMut(Event)>);

        let mut opened_before = false;
        let on_open = Closure::wrap(Box::new(move |_event: Event| {
            if opened_before {
                let _ = tx.unbounded_send(());
            }
            opened_before = true;
        }) as Box<dyn FnMut(Event)>);

        source
            .add_event_listener_with_callback(CHANGE_EVENT, on_change.as_ref().unchecked_ref())
            .map_err(|_| ClientError::Network("failed to listen for changes".into()))?;
        source
            .add_event_listener_with_callback("open", on_open.as_ref().unchecked_ref())
            .map_err(|_| ClientError::Network("failed to listen for reconnects".into()))?;

        Ok(Self {
            source,
            on_change,
            on_open,
            changes: Rc::new(Mutex::new(rx)),
        })
    }

    /// Resolves with `true` on the next change, folding any burst already
    /// queued into it, or `false` once the stream is closed.
    pub fn next_change(&self) -> impl Future<Output = bool> + 'static {
        let changes = Rc::clone(&self.changes);
        async move {
            let mut changes = changes.lock().await;
            if changes.next().await.is_none() {
                return false;
            }
            while changes.try_recv().is_ok() {}
            true
        }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        let _ = self
            .source
            .remove_event_listener_with_callback(CHANGE_EVENT, self.on_change.as_ref().unchecked_ref());
        let _ = self
            .source
            .remove_event_listener_with_callback("open", self.on_open.as_ref().unchecked_ref());
        self.source.close();
    }
}

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::warn;

use super::event::Event;
use super::sink::{EventSink, StdOutSink};

type SharedSinks = Arc<Mutex<Vec<Box<dyn EventSink>>>>;

/// Fan-out hub between cascade participants and their observers.
///
/// Producers hold a cheap [`flume::Sender`] clone obtained from
/// [`get_sender`](EventBus::get_sender); one background listener drains the
/// channel and hands each event to every registered [`EventSink`]. The
/// channel is unbounded so emission never blocks an executing node.
pub struct EventBus {
    sinks: SharedSinks,
    tx: flume::Sender<Event>,
    rx: flume::Receiver<Event>,
    listener: Mutex<Option<Listener>>,
}

/// Handle to the spawned listener task.
struct Listener {
    stop: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    /// Bus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Bus with a pre-assembled sink list.
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            tx,
            rx,
            listener: Mutex::new(None),
        }
    }

    /// Attach another sink, also while the listener is already running.
    ///
    /// # Example
    /// ```no_run
    /// use canvasflow::event_bus::{ChannelSink, EventBus};
    ///
    /// let bus = EventBus::default();
    /// bus.listen_for_events();
    ///
    /// let (sink, _events) = ChannelSink::pair();
    /// bus.add_sink(sink);
    /// // Events now reach both stdout and the stream.
    /// ```
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().unwrap().push(Box::new(sink));
    }

    /// Clone of the sender side for producers.
    pub fn get_sender(&self) -> flume::Sender<Event> {
        self.tx.clone()
    }

    /// Spawn the background listener. Idempotent; a second call is a no-op.
    pub fn listen_for_events(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }

        let rx = self.rx.clone();
        let sinks = Arc::clone(&self.sinks);
        let (stop, mut stopped) = oneshot::channel();

        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => {
                        // Deliver whatever producers queued before the stop.
                        while let Ok(event) = rx.try_recv() {
                            deliver(&sinks, &event);
                        }
                        break;
                    }
                    received = rx.recv_async() => match received {
                        Ok(event) => deliver(&sinks, &event),
                        Err(_) => break,
                    },
                }
            }
        });

        *guard = Some(Listener { stop, worker });
    }

    /// Stop the listener, flushing queued events before returning.
    pub async fn stop_listener(&self) {
        let listener = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(listener) = listener {
            let _ = listener.stop.send(());
            let _ = listener.worker.await;
        }
    }
}

fn deliver(sinks: &SharedSinks, event: &Event) {
    let mut guard = sinks.lock().unwrap();
    for sink in guard.iter_mut() {
        if let Err(e) = sink.handle(event) {
            warn!(error = %e, "event sink write failed");
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock()
            && let Some(listener) = guard.take()
        {
            let _ = listener.stop.send(());
            listener.worker.abort();
        }
    }
}

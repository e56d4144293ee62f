//! Asynchronous data-available notification
//!
//! Sessions that ask for asynchronous notification are registered as
//! observers. After every completed write the device calls
//! [`AsyncNotifier::notify`], and the notifier tells each observer that new
//! data is available. How the news travels is up to the implementation.
//!
//! The bundled [`NotificationQueue`] gives each registered session its own
//! `tokio::sync::broadcast` channel. Anyone holding the session's handle can
//! [`NotificationQueue::subscribe`] to it, from sync code with `blocking_recv`
//! or from async code with `recv().await`.
//!
//! # Lifecycle
//!
//! 10. Session: `set_async(true)` → `register(handle)`
//! 20. Observer: `subscribe(handle)` → receiver
//! 30. Writer: completed write → `notify(DataAvailable)` → every receiver gets it
//! 40. Session: `set_async(false)` or close → `deregister(handle)`, channel dropped,
//!     receivers see `Closed` after draining
//!
//! `deregister` is idempotent: close always calls it, registered or not.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::idgen::Handle;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A write completed; readers may find data
    DataAvailable,
}

/// Observer registry the device reports to
pub trait AsyncNotifier: Send + Sync {
    fn register(&self, session: Handle);
    fn deregister(&self, session: Handle);
    fn notify(&self, event: DeviceEvent);
}

struct Observer {
    sender: broadcast::Sender<DeviceEvent>,
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}

/// Broadcast-channel backed notifier
#[derive(Clone)]
pub struct NotificationQueue {
    observers: Arc<Mutex<HashMap<Handle, Observer>>>,
    channel_capacity: usize,
}

impl NotificationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `channel_capacity` bounds how many unreceived events each observer
    /// keeps before the oldest are dropped
    #[must_use]
    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            observers: Arc::new(Mutex::new(HashMap::new())),
            channel_capacity: channel_capacity.max(1),
        }
    }

    #[must_use]
    pub fn is_registered(&self, session: Handle) -> bool {
        self.observers.lock().contains_key(&session)
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Receive the events addressed to a registered session.
    ///
    /// Returns `None` if the session is not registered.
    #[must_use]
    pub fn subscribe(&self, session: Handle) -> Option<broadcast::Receiver<DeviceEvent>> {
        let observers = self.observers.lock();
        match observers.get(&session) {
            Some(observer) => Some(observer.sender.subscribe()),
            None => {
                log::warn!("queue.subscribe: {session} is not registered");
                None
            }
        }
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncNotifier for NotificationQueue {
    fn register(&self, session: Handle) {
        let mut observers = self.observers.lock();
        if observers.contains_key(&session) {
            log::warn!("queue.register: {session} already registered");
            return;
        }
        let (sender, _rx) = broadcast::channel(self.channel_capacity);
        observers.insert(session, Observer { sender });
    }

    fn deregister(&self, session: Handle) {
        if self.observers.lock().remove(&session).is_some() {
            log::debug!("queue.deregister: {session}");
        }
    }

    fn notify(&self, event: DeviceEvent) {
        let observers = self.observers.lock();
        log::debug!(
            "queue.notify: {event:?} to {} observer(s)",
            observers.len()
        );
        for (session, observer) in observers.iter() {
            if observer.sender.send(event).is_err() {
                log::debug!("queue.notify: nobody subscribed for {session}");
            }
        }
    }
}

impl std::fmt::Debug for NotificationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationQueue")
            .field("observers", &*self.observers.lock())
            .finish()
    }
}

//! Continuous foreground and background location watching.
//!
//! Each watch kind is an independent `Idle ⇄ Watching` state machine. Every
//! started watch gets a fresh generation token that its host callback
//! captures; a delivery whose token no longer matches the active one is
//! dropped, so stopping a watch also silences callbacks already in flight.
//!
//! Updates pass through the validator, are written to the cache and are then
//! fanned out to the subscribers of that watch kind in registration order.
//! No lock is held while calling the host or a subscriber.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::host::{PositionHost, PositionUpdate, WatchCallback, WatchId};
use crate::cache::LocationCache;
use crate::config::{WatchConfig, WatchOptions};
use crate::location::{AccuracyValidator, Coordinate};
use crate::permission::PermissionGateway;

/// Which of the two watches an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    Foreground,
    Background,
}

impl WatchKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

/// Subscriber callback receiving validated fixes.
pub type LocationCallback = Arc<dyn Fn(&Coordinate) + Send + Sync>;

#[derive(Default)]
struct SubscriberEntries {
    next_id: u64,
    entries: Vec<(u64, LocationCallback)>,
}

/// Ordered subscriber list for one watch kind.
#[derive(Default)]
struct SubscriberList {
    inner: Mutex<SubscriberEntries>,
}

impl SubscriberList {
    fn lock(&self) -> MutexGuard<'_, SubscriberEntries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(self: &Arc<Self>, callback: LocationCallback) -> Subscription {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.push((id, callback));
        drop(inner);

        Subscription {
            id,
            list: Arc::downgrade(self),
            active: AtomicBool::new(true),
        }
    }

    fn remove(&self, id: u64) {
        self.lock().entries.retain(|(entry_id, _)| *entry_id != id);
    }

    fn snapshot(&self) -> Vec<LocationCallback> {
        self.lock()
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn clear(&self) {
        self.lock().entries.clear();
    }
}

/// Handle returned by a subscribe call.
///
/// Dropping the handle leaves the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    list: Weak<SubscriberList>,
    active: AtomicBool,
}

impl Subscription {
    /// Removes exactly this callback. Later calls do nothing.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            if let Some(list) = self.list.upgrade() {
                list.remove(self.id);
            }
        }
    }

    /// False once unsubscribed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveWatch {
    token: u64,
    /// `None` while the host registration is in progress
    host_id: Option<WatchId>,
}

#[derive(Default)]
struct Slot {
    active: Option<ActiveWatch>,
}

/// State reachable from host callbacks.
struct WatchShared<H> {
    host: Arc<H>,
    cache: Arc<LocationCache>,
    validator: AccuracyValidator,
    config: WatchConfig,
    next_token: AtomicU64,
    foreground: Mutex<Slot>,
    background: Mutex<Slot>,
    foreground_subscribers: Arc<SubscriberList>,
    background_subscribers: Arc<SubscriberList>,
}

impl<H: PositionHost + 'static> WatchShared<H> {
    fn slot(&self, kind: WatchKind) -> MutexGuard<'_, Slot> {
        let slot = match kind {
            WatchKind::Foreground => &self.foreground,
            WatchKind::Background => &self.background,
        };
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    const fn options(&self, kind: WatchKind) -> &WatchOptions {
        match kind {
            WatchKind::Foreground => &self.config.foreground,
            WatchKind::Background => &self.config.background,
        }
    }

    fn subscribers(&self, kind: WatchKind) -> &Arc<SubscriberList> {
        match kind {
            WatchKind::Foreground => &self.foreground_subscribers,
            WatchKind::Background => &self.background_subscribers,
        }
    }

    fn is_current(&self, kind: WatchKind, token: u64) -> bool {
        self.slot(kind).active.is_some_and(|a| a.token == token)
    }

    /// Clears the slot if it still belongs to `token`.
    fn release(&self, kind: WatchKind, token: u64) -> Option<ActiveWatch> {
        let mut slot = self.slot(kind);
        if slot.active.is_some_and(|a| a.token == token) {
            slot.active.take()
        } else {
            None
        }
    }

    fn deliver(&self, kind: WatchKind, token: u64, update: PositionUpdate) {
        if !self.is_current(kind, token) {
            log::debug!("Dropping stale {} watch delivery", kind.as_str());
            return;
        }

        let position = match update {
            Ok(position) => position,
            Err(e) if e.is_permission_revoked() => {
                log::warn!("Location permission revoked, stopping {} watch", kind.as_str());
                if let Some(host_id) = self.release(kind, token).and_then(|a| a.host_id) {
                    self.host.clear_watch(host_id);
                }
                return;
            }
            Err(e) => {
                log::debug!("Recoverable {} watch error: {e}", kind.as_str());
                return;
            }
        };

        let coordinate = match position.to_coordinate() {
            Ok(coordinate) => coordinate,
            Err(e) => {
                log::warn!("Dropping malformed {} watch update: {e}", kind.as_str());
                return;
            }
        };

        // Both watches check movement against the one shared current location.
        let previous = self.cache.current_location();
        let validation = self.validator.validate(&coordinate, previous.as_ref());
        if !validation.is_valid {
            log::warn!(
                "Dropping implausible {} watch update: {}",
                kind.as_str(),
                validation.issues.join("; ")
            );
            return;
        }

        let source = position.source_or(self.options(kind).accuracy);
        self.cache.store_last_known(coordinate, source);

        // stop() may have run while the update was being validated.
        if !self.is_current(kind, token) {
            return;
        }
        for subscriber in self.subscribers(kind).snapshot() {
            subscriber(&coordinate);
        }
    }
}

/// Foreground and background watch state machines.
pub struct WatchController<G, H> {
    gateway: Arc<G>,
    shared: Arc<WatchShared<H>>,
}

impl<G: PermissionGateway, H: PositionHost + 'static> WatchController<G, H> {
    pub fn new(
        gateway: Arc<G>,
        host: Arc<H>,
        cache: Arc<LocationCache>,
        validator: AccuracyValidator,
        config: WatchConfig,
    ) -> Self {
        Self {
            gateway,
            shared: Arc::new(WatchShared {
                host,
                cache,
                validator,
                config,
                next_token: AtomicU64::new(0),
                foreground: Mutex::new(Slot::default()),
                background: Mutex::new(Slot::default()),
                foreground_subscribers: Arc::default(),
                background_subscribers: Arc::default(),
            }),
        }
    }

    /// Starts the foreground watch.
    ///
    /// Returns `true` if the watch is active afterwards, including when it
    /// already was. Returns `false` without side effects if foreground
    /// permission is not granted or the host refuses the registration.
    pub async fn start_watch(&self) -> bool {
        self.start(WatchKind::Foreground).await
    }

    /// Starts the background watch. May prompt for background permission.
    pub async fn start_background_watch(&self) -> bool {
        self.start(WatchKind::Background).await
    }

    /// Stops the foreground watch. Idempotent.
    pub fn stop_watch(&self) {
        self.stop(WatchKind::Foreground);
    }

    /// Stops the background watch. Idempotent.
    pub fn stop_background_watch(&self) {
        self.stop(WatchKind::Background);
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.is_active(WatchKind::Foreground)
    }

    #[must_use]
    pub fn is_background_watching(&self) -> bool {
        self.is_active(WatchKind::Background)
    }

    /// True if a watch of `kind` is active or being registered.
    #[must_use]
    pub fn is_active(&self, kind: WatchKind) -> bool {
        self.shared.slot(kind).active.is_some()
    }

    /// Host id of the active watch, if registration has completed.
    #[must_use]
    pub fn host_watch_id(&self, kind: WatchKind) -> Option<WatchId> {
        self.shared.slot(kind).active.and_then(|a| a.host_id)
    }

    /// Registers a callback for validated foreground updates.
    pub fn subscribe(
        &self,
        callback: impl Fn(&Coordinate) + Send + Sync + 'static,
    ) -> Subscription {
        self.shared
            .subscribers(WatchKind::Foreground)
            .add(Arc::new(callback))
    }

    /// Registers a callback for validated background updates.
    pub fn subscribe_background(
        &self,
        callback: impl Fn(&Coordinate) + Send + Sync + 'static,
    ) -> Subscription {
        self.shared
            .subscribers(WatchKind::Background)
            .add(Arc::new(callback))
    }

    #[must_use]
    pub fn subscriber_count(&self, kind: WatchKind) -> usize {
        self.shared.subscribers(kind).len()
    }

    /// Stops both watches and drops every subscriber.
    pub fn cleanup(&self) {
        self.stop(WatchKind::Foreground);
        self.stop(WatchKind::Background);
        self.shared.foreground_subscribers.clear();
        self.shared.background_subscribers.clear();
    }

    async fn start(&self, kind: WatchKind) -> bool {
        if self.is_active(kind) {
            return true;
        }

        let permission = match kind {
            WatchKind::Foreground => self.gateway.request_foreground().await,
            WatchKind::Background => self.gateway.request_background().await,
        };
        if !permission.granted {
            log::info!(
                "Not starting {} watch: permission {}",
                kind.as_str(),
                permission.status.as_str()
            );
            return false;
        }

        let token = self.shared.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut slot = self.shared.slot(kind);
            if slot.active.is_some() {
                return true;
            }
            slot.active = Some(ActiveWatch {
                token,
                host_id: None,
            });
        }

        let weak = Arc::downgrade(&self.shared);
        let callback: WatchCallback = Arc::new(move |update| {
            if let Some(shared) = weak.upgrade() {
                shared.deliver(kind, token, update);
            }
        });

        let registered = self
            .shared
            .host
            .watch_position(self.shared.options(kind), callback);

        match registered {
            Ok(host_id) => {
                let mut slot = self.shared.slot(kind);
                match slot.active.as_mut() {
                    Some(active) if active.token == token => {
                        active.host_id = Some(host_id);
                        drop(slot);
                        log::info!("Started {} watch", kind.as_str());
                        true
                    }
                    _ => {
                        // Stopped or revoked during registration.
                        drop(slot);
                        self.shared.host.clear_watch(host_id);
                        false
                    }
                }
            }
            Err(e) => {
                self.shared.release(kind, token);
                log::warn!("Failed to register {} watch: {e}", kind.as_str());
                false
            }
        }
    }

    fn stop(&self, kind: WatchKind) {
        let active = self.shared.slot(kind).active.take();
        if let Some(active) = active {
            if let Some(host_id) = active.host_id {
                self.shared.host.clear_watch(host_id);
            }
            log::info!("Stopped {} watch", kind.as_str());
        }
    }
}

//! Scripted host doubles for tests.
//!
//! Available to unit tests and, through the `test-utils` feature, to
//! integration tests and embedding applications.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::config::WatchOptions;
use crate::permission::{
    BinaryPermissionHost, HostPermissionError, HostPermissionStatus, StatusPermissionHost,
};
use crate::position::{
    HostPosition, HostPositionError, PositionCallback, PositionHost, PositionOptions,
    PositionUpdate, ProviderStatus, WatchCallback, WatchId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A host fix stamped with the current time.
#[must_use]
pub fn host_fix(latitude: f64, longitude: f64, accuracy: f64) -> HostPosition {
    HostPosition::new(latitude, longitude, accuracy, Utc::now().timestamp_millis())
}

#[derive(Debug)]
struct PermissionState<T> {
    current: HashMap<&'static str, T>,
    outcomes: HashMap<&'static str, T>,
    failure: Option<String>,
    requests: usize,
}

impl<T> Default for PermissionState<T> {
    fn default() -> Self {
        Self {
            current: HashMap::new(),
            outcomes: HashMap::new(),
            failure: None,
            requests: 0,
        }
    }
}

impl<T: Copy> PermissionState<T> {
    fn check(&self, permission: &'static str, default: T) -> Result<T, HostPermissionError> {
        if let Some(message) = &self.failure {
            return Err(HostPermissionError(message.clone()));
        }
        Ok(self.current.get(permission).copied().unwrap_or(default))
    }

    fn request(&mut self, permission: &'static str, default: T) -> Result<T, HostPermissionError> {
        if let Some(message) = &self.failure {
            return Err(HostPermissionError(message.clone()));
        }
        self.requests += 1;
        let outcome = self
            .outcomes
            .get(permission)
            .or_else(|| self.current.get(permission))
            .copied()
            .unwrap_or(default);
        self.current.insert(permission, outcome);
        Ok(outcome)
    }
}

/// Binary permission host. Permissions start not granted; a prompt answers
/// with the configured outcome, else the current value.
#[derive(Debug, Clone, Default)]
pub struct MockBinaryPermissionHost {
    state: Arc<Mutex<PermissionState<bool>>>,
}

impl MockBinaryPermissionHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value reported by `check`.
    pub fn set(&self, permission: &'static str, granted: bool) {
        lock(&self.state).current.insert(permission, granted);
    }

    /// Sets what the user answers when prompted.
    pub fn set_request_outcome(&self, permission: &'static str, granted: bool) {
        lock(&self.state).outcomes.insert(permission, granted);
    }

    /// Makes every query fail.
    pub fn fail_with(&self, message: &str) {
        lock(&self.state).failure = Some(message.to_string());
    }

    /// Number of prompts shown.
    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.state).requests
    }
}

impl BinaryPermissionHost for MockBinaryPermissionHost {
    async fn check(&self, permission: &'static str) -> Result<bool, HostPermissionError> {
        lock(&self.state).check(permission, false)
    }

    async fn request(&self, permission: &'static str) -> Result<bool, HostPermissionError> {
        lock(&self.state).request(permission, false)
    }
}

/// Rich-status permission host. Permissions start denied.
#[derive(Debug, Clone, Default)]
pub struct MockStatusPermissionHost {
    state: Arc<Mutex<PermissionState<HostPermissionStatus>>>,
}

impl MockStatusPermissionHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, permission: &'static str, status: HostPermissionStatus) {
        lock(&self.state).current.insert(permission, status);
    }

    pub fn set_request_outcome(&self, permission: &'static str, status: HostPermissionStatus) {
        lock(&self.state).outcomes.insert(permission, status);
    }

    pub fn fail_with(&self, message: &str) {
        lock(&self.state).failure = Some(message.to_string());
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.state).requests
    }
}

impl StatusPermissionHost for MockStatusPermissionHost {
    async fn check(
        &self,
        permission: &'static str,
    ) -> Result<HostPermissionStatus, HostPermissionError> {
        lock(&self.state).check(permission, HostPermissionStatus::Denied)
    }

    async fn request(
        &self,
        permission: &'static str,
    ) -> Result<HostPermissionStatus, HostPermissionError> {
        lock(&self.state).request(permission, HostPermissionStatus::Denied)
    }
}

/// Scripted answer to a single position request.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Fix(HostPosition),
    Error(HostPositionError),
    /// Never answers
    Hang,
}

struct PositionState {
    script: VecDeque<ScriptedResponse>,
    requested: Vec<PositionOptions>,
    /// Callbacks of hanging requests, kept alive so the request never resolves
    pending: Vec<PositionCallback>,
    next_watch_id: u64,
    watches: Vec<(WatchId, WatchCallback)>,
    watch_options: Vec<WatchOptions>,
    cleared: Vec<WatchId>,
    watch_failure: Option<HostPositionError>,
    provider: Result<ProviderStatus, HostPositionError>,
}

impl Default for PositionState {
    fn default() -> Self {
        Self {
            script: VecDeque::new(),
            requested: Vec::new(),
            pending: Vec::new(),
            next_watch_id: 0,
            watches: Vec::new(),
            watch_options: Vec::new(),
            cleared: Vec::new(),
            watch_failure: None,
            provider: Ok(ProviderStatus {
                gps_enabled: true,
                network_enabled: true,
            }),
        }
    }
}

/// Position host answering from a script.
///
/// Requests beyond the script fail with "position unavailable". Callbacks
/// are invoked synchronously, outside the internal lock. Clones share state.
#[derive(Clone, Default)]
pub struct MockPositionHost {
    state: Arc<Mutex<PositionState>>,
}

impl std::fmt::Debug for MockPositionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MockPositionHost")
            .field("scripted", &state.script.len())
            .field("attempts", &state.requested.len())
            .field("watches", &state.watches.len())
            .finish()
    }
}

impl MockPositionHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: ScriptedResponse) {
        lock(&self.state).script.push_back(response);
    }

    pub fn push_fix(&self, position: HostPosition) {
        self.push(ScriptedResponse::Fix(position));
    }

    pub fn push_error(&self, error: HostPositionError) {
        self.push(ScriptedResponse::Error(error));
    }

    pub fn push_hang(&self) {
        self.push(ScriptedResponse::Hang);
    }

    /// Number of single-fix requests received.
    #[must_use]
    pub fn attempts(&self) -> usize {
        lock(&self.state).requested.len()
    }

    /// Options of every single-fix request, in order.
    #[must_use]
    pub fn requested_options(&self) -> Vec<PositionOptions> {
        lock(&self.state).requested.clone()
    }

    /// Options of every watch registration, in order.
    #[must_use]
    pub fn watch_options(&self) -> Vec<WatchOptions> {
        lock(&self.state).watch_options.clone()
    }

    /// Ids of watches not yet cleared.
    #[must_use]
    pub fn active_watches(&self) -> Vec<WatchId> {
        lock(&self.state).watches.iter().map(|(id, _)| *id).collect()
    }

    /// Ids passed to `clear_watch` that matched an active watch.
    #[must_use]
    pub fn cleared_watches(&self) -> Vec<WatchId> {
        lock(&self.state).cleared.clone()
    }

    /// Callback of an active watch, for simulating late deliveries.
    #[must_use]
    pub fn watch_callback(&self, id: WatchId) -> Option<WatchCallback> {
        lock(&self.state)
            .watches
            .iter()
            .find(|(watch_id, _)| *watch_id == id)
            .map(|(_, callback)| Arc::clone(callback))
    }

    /// Delivers an update to an active watch. Returns false if `id` is not
    /// active.
    pub fn emit(&self, id: WatchId, update: PositionUpdate) -> bool {
        match self.watch_callback(id) {
            Some(callback) => {
                callback(update);
                true
            }
            None => false,
        }
    }

    /// Makes the next watch registrations fail.
    pub fn fail_watch_registration(&self, error: HostPositionError) {
        lock(&self.state).watch_failure = Some(error);
    }

    pub fn set_provider_status(&self, status: ProviderStatus) {
        lock(&self.state).provider = Ok(status);
    }

    pub fn fail_provider_status(&self, error: HostPositionError) {
        lock(&self.state).provider = Err(error);
    }
}

impl PositionHost for MockPositionHost {
    fn get_current_position(&self, options: &PositionOptions, callback: PositionCallback) {
        let mut state = lock(&self.state);
        state.requested.push(*options);
        let response = state.script.pop_front().unwrap_or_else(|| {
            ScriptedResponse::Error(HostPositionError::position_unavailable())
        });

        let update = match response {
            ScriptedResponse::Fix(position) => Ok(position),
            ScriptedResponse::Error(error) => Err(error),
            ScriptedResponse::Hang => {
                state.pending.push(callback);
                return;
            }
        };
        drop(state);

        callback(update);
    }

    fn watch_position(
        &self,
        options: &WatchOptions,
        callback: WatchCallback,
    ) -> Result<WatchId, HostPositionError> {
        let mut state = lock(&self.state);
        if let Some(error) = state.watch_failure.clone() {
            return Err(error);
        }
        state.next_watch_id += 1;
        let id = WatchId(state.next_watch_id);
        state.watches.push((id, callback));
        state.watch_options.push(options.clone());
        Ok(id)
    }

    fn clear_watch(&self, id: WatchId) {
        let mut state = lock(&self.state);
        let before = state.watches.len();
        state.watches.retain(|(watch_id, _)| *watch_id != id);
        if state.watches.len() != before {
            state.cleared.push(id);
        }
    }

    async fn provider_status(&self) -> Result<ProviderStatus, HostPositionError> {
        lock(&self.state).provider.clone()
    }
}

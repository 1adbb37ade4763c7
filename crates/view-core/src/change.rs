//! Change notification tokens.
//!
//! A token answers "has the thing I was created for changed?". Tokens that
//! support active callbacks also push that answer to subscribers, so a cache
//! can evict an entry as soon as its source changes instead of on the next
//! lookup.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Callback run once when a token changes.
pub type ChangeCallback = Box<dyn FnOnce() + Send + 'static>;

/// Change notification handle.
pub trait ChangeToken: Send + Sync {
    /// Whether a change has occurred.
    fn has_changed(&self) -> bool;

    /// Whether the token invokes registered callbacks.
    ///
    /// When false, consumers must poll `has_changed`.
    fn active_change_callbacks(&self) -> bool {
        false
    }

    /// Register a callback for the change.
    ///
    /// If the token has already changed the callback runs immediately.
    /// Dropping the returned subscription unregisters the callback.
    fn register_change_callback(&self, callback: ChangeCallback) -> Subscription {
        let _ = callback;
        Subscription::none()
    }
}

/// Registration of a change callback. Unregisters on drop.
#[must_use = "dropping a subscription unregisters its callback"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + 'static>>,
    children: Vec<Subscription>,
}

impl Subscription {
    /// A subscription with nothing to release.
    pub fn none() -> Self {
        Self {
            release: None,
            children: Vec::new(),
        }
    }

    /// A subscription that runs `release` when dropped.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
            children: Vec::new(),
        }
    }

    /// Combine several subscriptions into one.
    pub fn combine(children: Vec<Subscription>) -> Self {
        Self {
            release: None,
            children,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .field("children", &self.children.len())
            .finish()
    }
}

#[derive(Default)]
struct SignalState {
    changed: AtomicBool,
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, ChangeCallback)>>,
}

impl SignalState {
    fn unregister(&self, id: u64) {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
        callbacks.retain(|(cb_id, _)| *cb_id != id);
    }
}

/// Owner side of a manually signalled token.
///
/// ```ignore
/// let source = ChangeTokenSource::new();
/// let token = source.token();
/// source.signal();
/// assert!(token.has_changed());
/// ```
#[derive(Default)]
pub struct ChangeTokenSource {
    state: Arc<SignalState>,
}

impl ChangeTokenSource {
    /// Create a new, unsignalled source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a token observing this source.
    pub fn token(&self) -> SignalChangeToken {
        SignalChangeToken {
            state: Arc::clone(&self.state),
        }
    }

    /// Mark the token changed and run its callbacks.
    ///
    /// Callbacks run on the calling thread, outside the internal lock.
    /// Signalling twice is a no-op.
    pub fn signal(&self) {
        if self.state.changed.swap(true, Ordering::SeqCst) {
            return;
        }

        let callbacks = {
            let mut guard = self
                .state
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };

        tracing::trace!(callbacks = callbacks.len(), "change token signalled");

        for (_, callback) in callbacks {
            callback();
        }
    }

    /// Whether `signal` has been called.
    pub fn is_signalled(&self) -> bool {
        self.state.changed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ChangeTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTokenSource")
            .field("signalled", &self.is_signalled())
            .finish()
    }
}

/// Token fired by a `ChangeTokenSource`.
#[derive(Clone)]
pub struct SignalChangeToken {
    state: Arc<SignalState>,
}

impl ChangeToken for SignalChangeToken {
    fn has_changed(&self) -> bool {
        self.state.changed.load(Ordering::SeqCst)
    }

    fn active_change_callbacks(&self) -> bool {
        true
    }

    fn register_change_callback(&self, callback: ChangeCallback) -> Subscription {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut callbacks = self
                .state
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.state.changed.load(Ordering::SeqCst) {
                callbacks.push((id, callback));
                let state: Weak<SignalState> = Arc::downgrade(&self.state);
                return Subscription::new(move || {
                    if let Some(state) = state.upgrade() {
                        state.unregister(id);
                    }
                });
            }
        }

        callback();
        Subscription::none()
    }
}

impl fmt::Debug for SignalChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalChangeToken")
            .field("changed", &self.has_changed())
            .finish()
    }
}

/// Token that never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverChangeToken;

impl ChangeToken for NeverChangeToken {
    fn has_changed(&self) -> bool {
        false
    }
}

/// Token that changes when any of its inner tokens change.
#[derive(Clone, Default)]
pub struct CompositeChangeToken {
    tokens: Vec<Arc<dyn ChangeToken>>,
}

impl CompositeChangeToken {
    /// Create a composite over `tokens`.
    pub fn new(tokens: Vec<Arc<dyn ChangeToken>>) -> Self {
        Self { tokens }
    }

    /// Inner tokens.
    pub fn tokens(&self) -> &[Arc<dyn ChangeToken>] {
        &self.tokens
    }
}

impl ChangeToken for CompositeChangeToken {
    fn has_changed(&self) -> bool {
        self.tokens.iter().any(|t| t.has_changed())
    }

    fn active_change_callbacks(&self) -> bool {
        self.tokens.iter().any(|t| t.active_change_callbacks())
    }

    fn register_change_callback(&self, callback: ChangeCallback) -> Subscription {
        // Runs at most once, whichever inner token fires first.
        let shared = Arc::new(Mutex::new(Some(callback)));
        let subscriptions = self
            .tokens
            .iter()
            .filter(|t| t.active_change_callbacks())
            .map(|t| {
                let shared = Arc::clone(&shared);
                t.register_change_callback(Box::new(move || {
                    let cb = shared.lock().unwrap_or_else(PoisonError::into_inner).take();
                    if let Some(cb) = cb {
                        cb();
                    }
                }))
            })
            .collect();
        Subscription::combine(subscriptions)
    }
}

impl fmt::Debug for CompositeChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeChangeToken")
            .field("tokens", &self.tokens.len())
            .field("changed", &self.has_changed())
            .finish()
    }
}

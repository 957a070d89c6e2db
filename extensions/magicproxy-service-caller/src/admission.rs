use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::MutexGuard;

pub type BusyHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// Serializes access to one connection among any number of callers.
///
/// Callers are counted from the moment they ask for admission until their
/// [`Admission`] is dropped. The busy handler fires with `true` when the
/// count leaves zero and with `false` when it returns to zero. Waiting
/// callers are admitted one at a time; the order is whatever the underlying
/// mutex grants, which is not guaranteed to be strict FIFO.
pub struct SingleFlight<T> {
    queued: AtomicUsize,
    slot: tokio::sync::Mutex<T>,
    busy_handler: Mutex<Option<BusyHandler>>,
}

impl<T: Send> SingleFlight<T> {
    pub fn new(value: T) -> Self {
        Self {
            queued: AtomicUsize::new(0),
            slot: tokio::sync::Mutex::new(value),
            busy_handler: Mutex::new(None),
        }
    }

    pub fn set_busy_handler<F>(&self, handler: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        *self
            .busy_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    /// Waits for exclusive use of the slot, counting the caller as queued
    /// while it waits and while it holds the admission.
    ///
    /// Dropping the returned future before it completes withdraws the
    /// caller without leaving it counted.
    pub async fn admit(&self) -> Admission<'_, T> {
        let ticket = Ticket::issue(self);
        let guard = self.slot.lock().await;
        Admission {
            guard,
            _ticket: ticket,
        }
    }

    /// Exclusive access without counting toward the busy state; used for
    /// connection management rather than calls.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        self.slot.lock().await
    }

    pub fn is_busy(&self) -> bool {
        self.queued() > 0
    }

    /// Callers currently waiting or holding an admission.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    fn notify_busy(&self, busy: bool) {
        tracing::trace!("Connection busy={}", busy);
        let handler = self
            .busy_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(busy);
        }
    }
}

struct Ticket<'a, T: Send> {
    owner: &'a SingleFlight<T>,
}

impl<'a, T: Send> Ticket<'a, T> {
    fn issue(owner: &'a SingleFlight<T>) -> Self {
        if owner.queued.fetch_add(1, Ordering::SeqCst) == 0 {
            owner.notify_busy(true);
        }
        Self { owner }
    }
}

impl<T: Send> Drop for Ticket<'_, T> {
    fn drop(&mut self) {
        if self.owner.queued.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.owner.notify_busy(false);
        }
    }
}

/// Exclusive access to the slot of a [`SingleFlight`].
pub struct Admission<'a, T: Send> {
    // Released before the ticket, so the next caller can proceed before the
    // busy state is re-evaluated.
    guard: MutexGuard<'a, T>,
    _ticket: Ticket<'a, T>,
}

impl<T: Send> Deref for Admission<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: Send> DerefMut for Admission<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

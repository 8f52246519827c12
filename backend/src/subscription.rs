//! Explicit subscription objects for long-lived listeners.
//!
//! A [`Subscription`] replaces callback registration: it holds the latest
//! value, lets the owner wait for the next change, and tears down the
//! producer when dropped or unsubscribed.

use futures::Stream;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Aborts the producing task when dropped.
#[derive(Debug)]
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Handle to a live value stream (auth state, live query).
///
/// Dropping the subscription unregisters the listener. For backends that
/// produce values from a background task (polling), that task is aborted.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: watch::Receiver<T>,
    _producer: Option<AbortOnDrop>,
}

impl<T> Subscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Subscription fed directly by the owner of the matching `watch::Sender`.
    #[must_use]
    pub const fn new(receiver: watch::Receiver<T>) -> Self {
        Self {
            receiver,
            _producer: None,
        }
    }

    /// Subscription fed by a background task, aborted with the subscription.
    #[must_use]
    pub const fn with_producer(receiver: watch::Receiver<T>, producer: AbortHandle) -> Self {
        Self {
            receiver,
            _producer: Some(AbortOnDrop(producer)),
        }
    }

    /// The latest delivered value.
    #[must_use]
    pub fn current(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Wait for the next value.
    ///
    /// Returns `None` once the producer has gone away and every value has
    /// been observed.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Stop listening. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// The current value followed by every change, ending when the producer
    /// goes away. Dropping the stream unsubscribes.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static {
        async_stream::stream! {
            let mut subscription = self;
            let current = subscription.receiver.borrow_and_update().clone();
            yield current;
            while let Some(value) = subscription.changed().await {
                yield value;
            }
        }
    }
}

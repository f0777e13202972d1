/// Deferred values that an external engine resolves at some later point
///
/// A [`Deferred`] is a future of `Result<T, ResolutionError>`. Values are produced either
/// through a [`Resolver`] handed to whoever owns the value, or from an existing future.
/// Several deferreds are combined with [`all3`] and transformed with [`Deferred::apply`].
use futures::future::{self, BoxFuture, FutureExt, TryFutureExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;

/// An upstream value failed to resolve
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value did not resolve: {reason}")]
pub struct ResolutionError {
    reason: String,
}

impl ResolutionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[allow(dead_code)]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A value that becomes available asynchronously
#[must_use = "deferred values do nothing unless awaited"]
pub struct Deferred<T> {
    inner: BoxFuture<'static, Result<T, ResolutionError>>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Wrap a future that yields the value
    pub fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, ResolutionError>> + Send + 'static,
    {
        Self { inner: fut.boxed() }
    }

    /// An already known value
    #[allow(dead_code)]
    pub fn ready(value: T) -> Self {
        Self::from_future(future::ready(Ok(value)))
    }

    /// A value that has already failed
    #[allow(dead_code)]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::from_future(future::ready(Err(ResolutionError::new(reason))))
    }

    /// Run a synchronous transform once the value is available
    pub fn apply<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Deferred::from_future(self.inner.map_ok(f))
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T, ResolutionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

/// Producer side of a [`Deferred`] created with [`channel`]
#[derive(Debug)]
pub struct Resolver<T> {
    tx: oneshot::Sender<Result<T, ResolutionError>>,
}

impl<T> Resolver<T> {
    /// Complete the deferred with a value
    pub fn resolve(self, value: T) {
        // A closed channel means the consumer stopped waiting.
        let _ = self.tx.send(Ok(value));
    }

    /// Fail the deferred
    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(ResolutionError::new(reason)));
    }

    /// True once the consumer has dropped its [`Deferred`]
    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a deferred value together with the handle that resolves it
///
/// Dropping the [`Resolver`] without calling `resolve` or `reject` fails the deferred.
pub fn channel<T: Send + 'static>() -> (Resolver<T>, Deferred<T>) {
    let (tx, rx) = oneshot::channel();

    let deferred = Deferred::from_future(async move {
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ResolutionError::new(
                "resolver dropped before producing a value",
            )),
        }
    });

    (Resolver { tx }, deferred)
}

/// Wait for all three values
///
/// Inputs may resolve in any order. The first failure fails the whole join and drops the
/// remaining inputs.
pub fn all3<A, B, C>(a: Deferred<A>, b: Deferred<B>, c: Deferred<C>) -> Deferred<(A, B, C)>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    Deferred::from_future(future::try_join3(a, b, c))
}

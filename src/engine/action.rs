// src/engine/action.rs

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Future returned by an action invocation.
pub type ActionFuture = BoxFuture<'static, anyhow::Result<()>>;

/// The warm-up work of a single unit.
///
/// An action receives the run's cancellation token. It is never started
/// after the token fired, but once running it is only stopped early if it
/// watches the token itself (or when the coordinator gives up after the
/// grace period and drops it).
#[derive(Clone)]
pub struct Action {
    inner: Arc<dyn Fn(CancellationToken) -> ActionFuture + Send + Sync>,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").finish_non_exhaustive()
    }
}

impl Action {
    /// Async action with access to the cancellation token.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |cancel| -> ActionFuture { Box::pin(f(cancel)) }),
        }
    }

    /// Synchronous action, run inline on a runtime worker.
    ///
    /// Only suitable for short work; blocking here holds a runtime thread.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |_cancel| {
            let f = Arc::clone(&f);
            async move { f() }
        })
    }

    /// Action that succeeds immediately.
    pub fn noop() -> Self {
        Self::new(|_cancel| async { Ok(()) })
    }

    pub(crate) fn invoke(&self, cancel: CancellationToken) -> ActionFuture {
        (self.inner)(cancel)
    }
}

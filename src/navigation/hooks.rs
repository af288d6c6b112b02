//! Lifecycle hook registry.
//!
//! # Responsibilities
//! - Hold `beforeEach`, `afterEach` and `onError` hooks in registration order
//! - Run them sequentially, each awaited before the next starts
//! - Turn hook failures and panics into `NavigationError`s
//!
//! # Design Decisions
//! - The hook list is cloned before running so hooks may register further
//!   hooks without deadlocking
//! - `onError` hooks never propagate: a failing error hook is logged and the
//!   remaining ones still run

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;

use crate::navigation::context::NavigationContext;
use crate::navigation::error::NavigationError;

/// What a `beforeEach` hook wants to happen next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    Continue,
    Abort,
    /// Restart navigation towards another target.
    Redirect(String),
}

impl From<bool> for HookDecision {
    fn from(proceed: bool) -> Self {
        if proceed {
            HookDecision::Continue
        } else {
            HookDecision::Abort
        }
    }
}

impl From<()> for HookDecision {
    fn from(_: ()) -> Self {
        HookDecision::Continue
    }
}

/// Payload delivered to `onError` hooks.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub error: Arc<NavigationError>,
    /// Navigation the error belongs to, when there was one.
    pub context: Option<NavigationContext>,
}

type HookFuture<T> = BoxFuture<'static, anyhow::Result<T>>;
type BeforeHook = Arc<dyn Fn(NavigationContext) -> HookFuture<HookDecision> + Send + Sync>;
type AfterHook = Arc<dyn Fn(NavigationContext) -> HookFuture<()> + Send + Sync>;
type ErrorHook = Arc<dyn Fn(ErrorEvent) -> HookFuture<()> + Send + Sync>;

/// Ordered hook lists.
#[derive(Default)]
pub struct HookRegistry {
    before: RwLock<Vec<BeforeHook>>,
    after: RwLock<Vec<AfterHook>>,
    error: RwLock<Vec<ErrorHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook run before each navigation. It resolves to anything
    /// convertible to [`HookDecision`]: `()` and `true` continue, `false`
    /// aborts.
    pub fn before_each<F, Fut, D>(&self, hook: F)
    where
        F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<D>> + Send + 'static,
        D: Into<HookDecision>,
    {
        self.before.write().push(Arc::new(move |ctx| {
            let fut = hook(ctx);
            async move { fut.await.map(Into::into) }.boxed()
        }));
    }

    /// Register a hook run after each committed navigation.
    pub fn after_each<F, Fut>(&self, hook: F)
    where
        F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.after.write().push(Arc::new(move |ctx| hook(ctx).boxed()));
    }

    /// Register a hook notified of every navigation error.
    pub fn on_error<F, Fut>(&self, hook: F)
    where
        F: Fn(ErrorEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.error.write().push(Arc::new(move |event| hook(event).boxed()));
    }

    pub fn len(&self) -> usize {
        self.before.read().len() + self.after.read().len() + self.error.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `beforeEach` hooks until one does not continue.
    pub(crate) async fn run_before(
        &self,
        ctx: &NavigationContext,
    ) -> Result<HookDecision, NavigationError> {
        let hooks = self.before.read().clone();
        for hook in hooks {
            let ctx = ctx.clone();
            let decision = guarded(async move { hook(ctx).await })
                .await
                .map_err(NavigationError::BeforeHook)?;
            if decision != HookDecision::Continue {
                return Ok(decision);
            }
        }
        Ok(HookDecision::Continue)
    }

    /// Run every `afterEach` hook; a failing hook is reported and the rest
    /// still run.
    pub(crate) async fn run_after(&self, ctx: &NavigationContext) {
        let hooks = self.after.read().clone();
        for hook in hooks {
            let hook_ctx = ctx.clone();
            if let Err(e) = guarded(async move { hook(hook_ctx).await }).await {
                self.dispatch_error(NavigationError::AfterHook(e), Some(ctx))
                    .await;
            }
        }
    }

    /// Deliver an error to every `onError` hook exactly once.
    pub(crate) async fn dispatch_error(
        &self,
        error: NavigationError,
        ctx: Option<&NavigationContext>,
    ) {
        tracing::warn!(error = %error, url = ctx.map(|c| c.full.as_str()), "Navigation error");
        let event = ErrorEvent {
            error: Arc::new(error),
            context: ctx.cloned(),
        };
        let hooks = self.error.read().clone();
        for hook in hooks {
            let event = event.clone();
            if let Err(e) = guarded(async move { hook(event).await }).await {
                tracing::debug!(error = %e, "onError hook failed");
            }
        }
    }
}

/// Await a hook future, converting a panic into an error.
async fn guarded<T>(fut: impl Future<Output = anyhow::Result<T>>) -> anyhow::Result<T> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(anyhow::anyhow!("hook panicked: {}", panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

//! Synchronous entry points for thread-per-call callers.
//!
//! The facade owns a tokio runtime and drives each workflow call to
//! completion on the calling thread. It must not be used from inside an
//! async context; `block_on` panics there.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use super::dto::{AuthResult, LoginRequest, RegisterRequest};
use super::errors::AuthError;
use super::repo_types::UserAccount;
use super::services::AuthWorkflow;

pub struct BlockingAuthWorkflow {
    inner: Arc<AuthWorkflow>,
    runtime: Runtime,
}

fn build_runtime() -> std::io::Result<Runtime> {
    Builder::new_multi_thread()
        .enable_all()
        .thread_name("authflow-worker")
        .build()
}

impl BlockingAuthWorkflow {
    /// Wraps a workflow whose collaborators do not depend on a particular runtime.
    pub fn new(inner: Arc<AuthWorkflow>) -> std::io::Result<Self> {
        Ok(Self {
            inner,
            runtime: build_runtime()?,
        })
    }

    /// Builds the workflow on the facade's own runtime, so I/O resources
    /// such as a connection pool are bound to the runtime that drives them.
    pub fn init<F, Fut>(make: F) -> anyhow::Result<Self>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<AuthWorkflow>>>,
    {
        let runtime = build_runtime()?;
        let inner = runtime.block_on(make())?;
        Ok(Self { inner, runtime })
    }

    pub fn register(&self, request: RegisterRequest) -> Result<AuthResult, AuthError> {
        self.runtime.block_on(self.inner.register(request))
    }

    pub fn authenticate(&self, request: LoginRequest) -> Result<AuthResult, AuthError> {
        self.runtime.block_on(self.inner.authenticate(request))
    }

    pub fn refresh(&self, refresh_token: &str) -> Result<AuthResult, AuthError> {
        self.runtime.block_on(self.inner.refresh(refresh_token))
    }

    pub fn current_user(&self, access_token: &str) -> Result<UserAccount, AuthError> {
        self.runtime.block_on(self.inner.current_user(access_token))
    }

    pub fn workflow(&self) -> &Arc<AuthWorkflow> {
        &self.inner
    }
}

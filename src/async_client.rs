//! Async wrapper around [`Estimator`] for use in async runtimes (Tokio, etc.).
//!
//! Estimation is blocking network I/O plus paced sleeps, so every call runs
//! on the blocking thread pool via [`tokio::task::spawn_blocking`]. Dropping
//! the returned future cancels the in-flight estimation at its next retry,
//! pause or page boundary.
//!
//! # Example
//!
//! ```no_run
//! use graphite::{AsyncEstimator, EstimateRequest};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let estimator = AsyncEstimator::builder().build().await.unwrap();
//!     let resp = estimator
//!         .estimate_within(EstimateRequest::new("Carhartt J01"), Duration::from_secs(20))
//!         .await
//!         .unwrap();
//!     println!("{:?}", resp.public.casp);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::{GraphiteError, Result};
use crate::estimator::{Estimator, EstimatorBuilder};
use crate::fetch::Cancellation;
use crate::models::{EstimateRequest, EstimateResponse};

// ---------------------------------------------------------------------------
// AsyncEstimatorBuilder
// ---------------------------------------------------------------------------

/// Builder for an [`AsyncEstimator`]; wraps the sync [`EstimatorBuilder`].
#[derive(Default)]
pub struct AsyncEstimatorBuilder {
    inner: EstimatorBuilder,
}

impl AsyncEstimatorBuilder {
    /// Adjust the underlying sync builder.
    pub fn configure(mut self, f: impl FnOnce(EstimatorBuilder) -> EstimatorBuilder) -> Self {
        self.inner = f(self.inner);
        self
    }

    /// Build the estimator on the blocking pool (it may open files and a
    /// database).
    pub async fn build(self) -> Result<AsyncEstimator> {
        let inner = self.inner;
        tokio::task::spawn_blocking(move || {
            let estimator = inner.build()?;
            Ok(AsyncEstimator {
                inner: Some(Arc::new(estimator)),
            })
        })
        .await
        .map_err(|e| GraphiteError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// AsyncEstimator
// ---------------------------------------------------------------------------

/// Cancels the token when the owning future is dropped.
struct CancelOnDrop(Cancellation);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Async wrapper around [`Estimator`].
///
/// Cheap to share: concurrent estimations run on separate blocking threads
/// against the same underlying estimator.
pub struct AsyncEstimator {
    inner: Option<Arc<Estimator>>,
}

impl AsyncEstimator {
    pub fn builder() -> AsyncEstimatorBuilder {
        AsyncEstimatorBuilder::default()
    }

    /// Wrap an already-built estimator.
    pub fn from_estimator(estimator: Estimator) -> Self {
        Self {
            inner: Some(Arc::new(estimator)),
        }
    }

    fn estimator(&self) -> Result<Arc<Estimator>> {
        self.inner
            .clone()
            .ok_or_else(|| GraphiteError::InvalidArgument("estimator already closed".into()))
    }

    /// Run an estimation on the blocking pool.
    pub async fn estimate(&self, request: EstimateRequest) -> Result<EstimateResponse> {
        self.run(request, Cancellation::new()).await
    }

    /// Run an estimation that gives up on the live source after `timeout`.
    ///
    /// Fallback tiers still apply once the deadline passes.
    pub async fn estimate_within(
        &self,
        request: EstimateRequest,
        timeout: Duration,
    ) -> Result<EstimateResponse> {
        self.run(request, Cancellation::with_timeout(timeout)).await
    }

    async fn run(&self, request: EstimateRequest, cancel: Cancellation) -> Result<EstimateResponse> {
        let estimator = self.estimator()?;
        let guard = CancelOnDrop(cancel.clone());
        let result = tokio::task::spawn_blocking(move || estimator.estimate_with(&request, &cancel))
            .await
            .map_err(|e| GraphiteError::InvalidArgument(format!("Task join error: {e}")))?;
        drop(guard);
        result
    }
}

impl Drop for AsyncEstimator {
    fn drop(&mut self) {
        // The blocking HTTP client must not be torn down on an async worker.
        if let Some(inner) = self.inner.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn_blocking(move || drop(inner));
                }
                Err(_) => drop(inner),
            }
        }
    }
}

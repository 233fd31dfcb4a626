use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Per-backend admission control bounding in-flight requests.
///
/// Every backend gets a counting semaphore with the configured capacity.
/// The limiter never fails, it only delays: a full backend makes callers
/// wait until a slot frees up. With a capacity of zero the limiter is
/// disabled and [`BackendLimiter::enter`] is a no-op.
#[derive(Clone, Default)]
pub struct BackendLimiter {
    slots: Option<Arc<HashMap<String, Arc<Semaphore>>>>,
}

impl BackendLimiter {
    /// Builds a limiter over the fixed backend set. `limit` of zero
    /// disables admission control entirely.
    pub fn new(backends: &[String], limit: usize) -> Self {
        if limit == 0 {
            return Self { slots: None };
        }

        let slots = backends
            .iter()
            .map(|backend| (backend.clone(), Arc::new(Semaphore::new(limit))))
            .collect();

        Self {
            slots: Some(Arc::new(slots)),
        }
    }

    /// Waits for a slot on `backend`. Dropping the returned permit gives the
    /// slot back, on every exit path.
    ///
    /// The backend set is fixed at startup; asking for a backend that was
    /// never registered is a programming error and panics.
    pub async fn enter(&self, backend: &str) -> Option<OwnedSemaphorePermit> {
        let slots = self.slots.as_ref()?;
        let semaphore = slots
            .get(backend)
            .expect("limiter: backend not registered at startup")
            .clone();

        let permit = semaphore
            .acquire_owned()
            .await
            .expect("limiter semaphore is never closed");

        Some(permit)
    }

    pub fn is_disabled(&self) -> bool {
        self.slots.is_none()
    }
}

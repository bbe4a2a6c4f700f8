// src/infrastructure/fetch.rs
use crate::domain::DomainError;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::AbortHandle;
use tracing::debug;

#[derive(Default)]
struct Slot {
    generation: u64,
    in_flight: Option<AbortHandle>,
}

/// Single-slot request handle: starting a request aborts the one still in flight.
///
/// Clones share the slot, so a superseded caller resolves to
/// [`DomainError::Cancelled`] instead of delivering a stale response.
#[derive(Clone, Default)]
pub struct LatestRequest {
    slot: Arc<Mutex<Slot>>,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<T, F>(&self, request: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>> + Send + 'static,
        T: Send + 'static,
    {
        let (handle, generation) = {
            let mut slot = self.lock();
            if let Some(previous) = slot.in_flight.take() {
                debug!(generation = slot.generation, "Aborting superseded request");
                previous.abort();
            }
            slot.generation += 1;
            let handle = tokio::spawn(request);
            slot.in_flight = Some(handle.abort_handle());
            (handle, slot.generation)
        };

        let outcome = handle.await;

        {
            let mut slot = self.lock();
            if slot.generation == generation {
                slot.in_flight = None;
            }
        }

        match outcome {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(DomainError::Cancelled),
            Err(e) => Err(DomainError::Network {
                operation: "latest_request".to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Abort whatever is in flight.
    pub fn cancel(&self) {
        if let Some(handle) = self.lock().in_flight.take() {
            handle.abort();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.lock()
            .in_flight
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn given_single_request_when_running_then_returns_its_result() {
        let latest = LatestRequest::new();

        let value = latest.run(async { Ok::<_, DomainError>(7) }).await.unwrap();

        assert_eq!(value, 7);
        assert!(!latest.is_busy());
    }

    #[tokio::test]
    async fn given_request_in_flight_when_new_one_starts_then_first_is_cancelled() {
        // Arrange
        let latest = LatestRequest::new();
        let first_handle = latest.clone();
        let first = tokio::spawn(async move {
            first_handle
                .run(async {
                    sleep(Duration::from_secs(5)).await;
                    Ok::<_, DomainError>("stale")
                })
                .await
        });
        sleep(Duration::from_millis(50)).await;

        // Act
        let second = latest.run(async { Ok::<_, DomainError>("fresh") }).await;

        // Assert
        assert_eq!(second.unwrap(), "fresh");
        assert!(matches!(first.await.unwrap(), Err(DomainError::Cancelled)));
    }

    #[tokio::test]
    async fn given_request_in_flight_when_cancelling_then_resolves_cancelled() {
        let latest = LatestRequest::new();
        let handle = latest.clone();
        let pending = tokio::spawn(async move {
            handle
                .run(async {
                    sleep(Duration::from_secs(5)).await;
                    Ok::<_, DomainError>(())
                })
                .await
        });
        sleep(Duration::from_millis(50)).await;
        assert!(latest.is_busy());

        latest.cancel();

        assert!(matches!(pending.await.unwrap(), Err(DomainError::Cancelled)));
    }

    #[tokio::test]
    async fn given_failing_request_when_running_then_error_passes_through() {
        let latest = LatestRequest::new();

        let result = latest
            .run(async { Err::<(), _>(DomainError::PoemNotFound(3)) })
            .await;

        assert!(matches!(result, Err(DomainError::PoemNotFound(3))));
    }
}

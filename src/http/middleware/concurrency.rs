//! Concurrency limiting with backpressure.
//!
//! Uses a semaphore to enforce `max_concurrent_requests`. When the limit is
//! reached, new requests wait until a slot becomes available. A slot is held
//! until the response head is produced; streamed bodies do not hold one.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Semaphore;

/// Shared request slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimit {
    slots: Arc<Semaphore>,
    max: usize,
}

impl ConcurrencyLimit {
    pub fn new(max: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Get current available request slots.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Get configured maximum concurrent requests.
    pub fn max(&self) -> usize {
        self.max
    }
}

pub async fn concurrency_limit(
    State(limit): State<ConcurrencyLimit>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Acquire permit first (backpressure)
    let _permit = match limit.slots.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            tracing::error!("Request semaphore closed");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    tracing::trace!(available_slots = limit.available(), "Request slot acquired");
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_slot_released_after_response() {
        let limit = ConcurrencyLimit::new(1);
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                limit.clone(),
                concurrency_limit,
            ));

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(limit.available(), limit.max());
    }
}

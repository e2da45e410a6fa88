//! Tests for rate-limited client wrappers.

use async_trait::async_trait;
use lumiere_core::{GenerateRequest, GenerateResponse, Usage};
use lumiere_error::GenerationError;
use lumiere_interface::TextGenerator;
use lumiere_models::RateLimited;
use lumiere_rate_limit::RateLimiter;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct SlowEcho {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl TextGenerator for SlowEcho {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(GenerateResponse {
            text: req.prompt.clone(),
            usage: Usage::new(1, 1),
        })
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

#[tokio::test]
async fn test_concurrency_cap_respected() {
    let limited = Arc::new(RateLimited::new(
        SlowEcho::default(),
        RateLimiter::new(None, Some(2)),
    ));

    let mut handles = Vec::new();
    for i in 0..6 {
        let limited = limited.clone();
        handles.push(tokio::spawn(async move {
            limited
                .generate(&GenerateRequest::new(format!("p{}", i), 10))
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert!(limited.inner().peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(limited.model_name(), "echo");
}

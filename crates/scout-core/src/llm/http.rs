//! Shared plumbing for HTTP-backed providers

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Build a reqwest client with the provider timeout
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ScoutError::Http)
}

/// Convert a non-success response into a typed provider error
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> ScoutError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ScoutError::Provider {
        provider: provider.to_string(),
        status: Some(status.as_u16()),
        message: body,
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct ApiMetrics {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl ApiMetrics {
    pub(crate) fn start(&self) -> Instant {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        Instant::now()
    }

    pub(crate) fn finish<T>(&self, started: Instant, result: &Result<T>) {
        if result.is_err() {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
        let elapsed = started.elapsed().as_millis() as u64;
        self.total_latency_ms.fetch_add(elapsed, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: total,
            total_errors: self.total_errors.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                self.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub avg_latency_ms: f64,
}

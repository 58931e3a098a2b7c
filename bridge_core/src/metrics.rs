use std::time::Instant;

use bridge_runtime::HealthReport;

/// Counters rendered by the health endpoint.
#[derive(Debug, Clone)]
pub struct BridgeMetrics {
    started: Instant,
    pub request_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            request_count: 0,
            error_count: 0,
            last_error: None,
        }
    }
}

impl BridgeMetrics {
    pub fn uptime_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn record_request(&mut self) {
        self.request_count += 1;
    }

    pub fn record_error(&mut self, detail: impl Into<String>) {
        self.error_count += 1;
        self.last_error = Some(detail.into());
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_ms: self.uptime_ms(),
            request_count: self.request_count,
            error_count: self.error_count,
            last_error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_metrics_report_zero_counts() {
        let health = BridgeMetrics::default().health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.request_count, 0);
        assert_eq!(health.error_count, 0);
        assert_eq!(health.last_error, None);
    }

    #[test]
    fn errors_keep_the_latest_detail() {
        let mut metrics = BridgeMetrics::default();
        metrics.record_error("first");
        metrics.record_error("second");
        metrics.record_request();
        let health = metrics.health();
        assert_eq!(health.error_count, 2);
        assert_eq!(health.request_count, 1);
        assert_eq!(health.last_error.as_deref(), Some("second"));
    }
}

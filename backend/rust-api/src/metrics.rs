use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Cache Metrics (Redis)
    pub static ref CACHE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_operations_total",
        "Total number of cache operations",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref CACHE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "cache_operation_duration_seconds",
        "Cache operation duration in seconds",
        &["operation"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1]
    )
    .unwrap();

    // Quiz Metrics
    pub static ref GAMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_games_total",
        "Quiz game lifecycle events",
        &["event"]
    )
    .unwrap();

    pub static ref GAMES_ACTIVE: IntGauge = register_int_gauge!(
        "quiz_games_active",
        "Number of quiz games in progress"
    )
    .unwrap();

    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_answers_submitted_total",
        "Total number of accepted answer submissions",
        &["correct"]
    )
    .unwrap();

    pub static ref ANSWERS_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_answers_rejected_total",
        "Answer submissions rejected by the quiz engine",
        &["reason"]
    )
    .unwrap();

    pub static ref PERSISTENCE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "persistence_failures_total",
        "Best-effort writes and reads that failed",
        &["operation"]
    )
    .unwrap();

    pub static ref LEADERBOARD_FETCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "leaderboard_fetches_total",
        "Leaderboard queries by result",
        &["result"]
    )
    .unwrap();

    // Chat Metrics
    pub static ref CHAT_MESSAGES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "chat_messages_total",
        "Messages answered by keyword responders",
        &["responder", "matched"]
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Render all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track cache operation with metrics
pub async fn track_cache_operation<F, T, E>(operation: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    CACHE_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    CACHE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}

pub fn record_persistence_failure(operation: &str) {
    PERSISTENCE_FAILURES_TOTAL
        .with_label_values(&[operation])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_metrics() {
        ANSWERS_SUBMITTED_TOTAL.with_label_values(&["true"]).inc();

        let output = render_metrics().unwrap();
        assert!(output.contains("quiz_answers_submitted_total"));
    }

    #[tokio::test]
    async fn track_cache_operation_passes_result_through() {
        let ok: Result<u8, &str> = track_cache_operation("get", async { Ok(7) }).await;
        let err: Result<u8, &str> = track_cache_operation("get", async { Err("down") }).await;

        assert_eq!(ok, Ok(7));
        assert_eq!(err, Err("down"));
        assert!(
            CACHE_OPERATIONS_TOTAL
                .with_label_values(&["get", "error"])
                .get()
                >= 1
        );
    }
}

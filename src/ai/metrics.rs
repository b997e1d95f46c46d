//! Pipeline Metrics Collection
//!
//! Per-stage accounting of completion calls, token usage and latency for
//! one pipeline run. Safe to share across tasks.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = MetricsCollector::new(run_id.as_str());
//! metrics.record("write_section", &response);
//! println!("{}", metrics.summary().display());
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::ai::provider::LlmResponse;

/// Thread-safe metrics collector for one pipeline run.
///
/// Totals are atomics; the per-stage breakdown sits behind an RwLock.
pub struct MetricsCollector {
    run_id: String,
    start_time: Instant,
    api_calls: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
    /// Stage breakdown in first-recorded order
    stages: RwLock<Vec<StageMetrics>>,
}

/// Metrics for one pipeline stage
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageMetrics {
    pub name: String,
    pub api_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
}

/// Summary statistics for a pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSummary {
    pub run_id: String,
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
    pub stages: Vec<StageMetrics>,
}

impl MetricsCollector {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            stages: RwLock::new(Vec::new()),
        }
    }

    /// Record one completion against `stage`
    pub fn record(&self, stage: &str, response: &LlmResponse) {
        let input = response.usage.input_tokens as u64;
        let output = response.usage.output_tokens as u64;
        let latency = response.timing.total_ms;

        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens.fetch_add(input, Ordering::Relaxed);
        self.output_tokens.fetch_add(output, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency, Ordering::Relaxed);

        let mut stages = self.stages.write().unwrap_or_else(|poisoned| {
            tracing::error!("Metrics stages RwLock poisoned, recovering");
            poisoned.into_inner()
        });

        let entry = match stages.iter().position(|s| s.name == stage) {
            Some(idx) => &mut stages[idx],
            None => {
                stages.push(StageMetrics {
                    name: stage.to_string(),
                    ..Default::default()
                });
                let last = stages.len() - 1;
                &mut stages[last]
            }
        };
        entry.api_calls += 1;
        entry.input_tokens += input;
        entry.output_tokens += output;
        entry.latency_ms += latency;
    }

    /// Completion calls recorded so far
    pub fn api_calls(&self) -> u32 {
        self.api_calls.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> MetricsSummary {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency_ms = if api_calls > 0 {
            total_latency as f64 / api_calls as f64
        } else {
            0.0
        };

        let stages = self
            .stages
            .read()
            .unwrap_or_else(|poisoned| {
                tracing::error!("Metrics stages RwLock poisoned on read, recovering");
                poisoned.into_inner()
            })
            .clone();

        MetricsSummary {
            run_id: self.run_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls,
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms,
            stages,
        }
    }
}

impl MetricsSummary {
    /// Calls recorded for `stage`
    pub fn stage_calls(&self, stage: &str) -> u32 {
        self.stages
            .iter()
            .find(|s| s.name == stage)
            .map(|s| s.api_calls)
            .unwrap_or(0)
    }

    /// Format summary for display
    pub fn display(&self) -> String {
        let mut out = format!(
            "Run: {}\n\
             Duration: {:.1}s\n\
             API Calls: {}\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg Latency: {:.0}ms",
            self.run_id,
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_latency_ms,
        );
        for stage in &self.stages {
            out.push_str(&format!(
                "\n  {}: {} calls, {} tokens",
                stage.name,
                stage.api_calls,
                stage.input_tokens + stage.output_tokens
            ));
        }
        out
    }
}

/// Shared metrics collector for pipeline stages
pub type SharedMetrics = Arc<MetricsCollector>;

//! Progress events and cancellation for pipeline runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;

use super::pipeline::PipelineState;

/// Progress notification emitted while a run advances
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageEntered {
        state: PipelineState,
    },
    SectionAttempt {
        index: usize,
        heading: String,
        attempt: u32,
    },
    SectionAccepted {
        index: usize,
        word_count: usize,
        attempts: u32,
        warning: bool,
    },
    AssetsSkipped {
        reason: String,
    },
    Completed {
        word_count: usize,
        warnings: usize,
    },
}

pub type EventSender = mpsc::UnboundedSender<PipelineEvent>;

/// Optional event sink; a dropped receiver is not an error.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink(Option<EventSender>);

impl EventSink {
    pub(crate) fn new(sender: EventSender) -> Self {
        Self(Some(sender))
    }

    pub(crate) fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }
}

/// Cooperative cancellation flag, checked before every completion call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

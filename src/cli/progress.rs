//! Pipeline Progress Rendering
//!
//! Turns [`PipelineEvent`]s into console lines while a run is in flight.

use std::time::{Duration, Instant};

use console::style;
use tokio::sync::mpsc;

use crate::writer::{PipelineEvent, PipelineState};

/// Stateful event formatter; tracks section progress and elapsed time.
pub struct ProgressRenderer {
    total_sections: usize,
    accepted: usize,
    started: Instant,
}

impl ProgressRenderer {
    pub fn new(total_sections: usize) -> Self {
        Self {
            total_sections,
            accepted: 0,
            started: Instant::now(),
        }
    }

    /// Render one event, or `None` for events not worth a line
    pub fn line(&mut self, event: &PipelineEvent) -> Option<String> {
        match event {
            PipelineEvent::StageEntered { state } => match state {
                // Section stages are reported per attempt below
                PipelineState::WriteSection | PipelineState::Validate => None,
                other => Some(format!("{} {}", style("→").cyan(), other)),
            },
            PipelineEvent::SectionAttempt {
                index,
                heading,
                attempt,
            } => {
                // `attempt` counts retries, 0 is the first try
                let retry = if *attempt > 0 {
                    format!(" (retry {})", attempt)
                } else {
                    String::new()
                };
                Some(format!(
                    "  {} [{}/{}] {}{}",
                    style("✎").dim(),
                    index + 1,
                    self.total_sections,
                    heading,
                    style(retry).yellow()
                ))
            }
            PipelineEvent::SectionAccepted {
                word_count,
                attempts,
                warning,
                ..
            } => {
                self.accepted += 1;
                let bar = render_progress_bar(self.accepted, self.total_sections, 20);
                let mark = if *warning {
                    style("⚠").yellow()
                } else {
                    style("✓").green()
                };
                Some(format!(
                    "  {} {} {} words, {} attempt{}",
                    mark,
                    bar,
                    word_count,
                    attempts,
                    if *attempts == 1 { "" } else { "s" }
                ))
            }
            PipelineEvent::AssetsSkipped { reason } => Some(format!(
                "{} cover image skipped: {}",
                style("ℹ").blue(),
                reason
            )),
            PipelineEvent::Completed {
                word_count,
                warnings,
            } => Some(format!(
                "{} {} words in {}{}",
                style("✓").green().bold(),
                word_count,
                format_duration(self.started.elapsed()),
                if *warnings > 0 {
                    format!(", {} warning(s)", warnings)
                } else {
                    String::new()
                }
            )),
        }
    }

    /// Print events until the sending side is dropped
    pub fn spawn(
        mut self,
        mut receiver: mpsc::UnboundedReceiver<PipelineEvent>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Some(line) = self.line(&event) {
                    println!("{}", line);
                }
            }
        })
    }
}

fn render_progress_bar(completed: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}]", " ".repeat(width));
    }

    let progress = (completed as f32 / total as f32).min(1.0);
    let filled = (progress * width as f32) as usize;
    let empty = width.saturating_sub(filled);

    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

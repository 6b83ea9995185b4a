/*!
 * Plumbing shared by the two batch runners.
 *
 * Runner tuning comes from `JobConfig`; notification delivery is best effort;
 * every run ends with a `RunSummary` whatever the exit path.
 */

use futures::FutureExt;
use log::warn;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use crate::app_config::JobConfig;
use crate::database::models::JobStatus;
use crate::notifications::{Notification, Notifier};

/// Tuning constants of a runner loop
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerSettings {
    /// Units per translate_batch call
    pub batch_size: usize,
    /// Pause between two batches
    pub inter_batch_delay: Duration,
    /// Pause between two single-item fallback calls
    pub inter_item_delay: Duration,
    /// Terms requested per glossary generation call
    pub glossary_batch_size: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from(&JobConfig::default())
    }
}

impl From<&JobConfig> for RunnerSettings {
    fn from(config: &JobConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            inter_batch_delay: config.inter_batch_delay(),
            inter_item_delay: config.inter_item_delay(),
            glossary_batch_size: config.glossary_batch_size.max(1),
        }
    }
}

impl RunnerSettings {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_glossary_batch_size(mut self, glossary_batch_size: usize) -> Self {
        self.glossary_batch_size = glossary_batch_size.max(1);
        self
    }

    pub fn with_delays(mut self, inter_batch_delay: Duration, inter_item_delay: Duration) -> Self {
        self.inter_batch_delay = inter_batch_delay;
        self.inter_item_delay = inter_item_delay;
        self
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub job_id: String,
    /// Terminal status written by the runner
    pub status: JobStatus,
    /// Items attempted
    pub processed: usize,
    /// Items actually written
    pub updated: usize,
    /// Error text for failed runs
    pub error_detail: Option<String>,
}

/// Counters a runner loop keeps while it works
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Tally {
    pub processed: usize,
    pub updated: usize,
}

impl Tally {
    pub fn summary(&self, job_id: &str, status: JobStatus, error_detail: Option<String>) -> RunSummary {
        RunSummary {
            job_id: job_id.to_string(),
            status,
            processed: self.processed,
            updated: self.updated,
            error_detail,
        }
    }
}

/// Deliver a notification; a failing sink is logged and ignored
pub(crate) async fn notify_best_effort(notifier: &dyn Notifier, user_id: &str, notification: Notification) {
    let title = notification.title.clone();
    if let Err(e) = notifier.notify(user_id, notification).await {
        warn!("Failed to deliver notification '{}' to {}: {:#}", title, user_id, e);
    }
}

/// Sleep, skipping the timer entirely for a zero delay
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Run a loop body, turning both errors and panics into an error text
pub(crate) async fn catch_failure<T, F>(body: F) -> Result<T, String>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(payload) => Err(format!("panic: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Deep link to a file in one target language
pub fn file_link(file_id: &str, target_language: &str) -> String {
    format!("/files/{}?lang={}", file_id, target_language)
}

/// Deep link to the glossary of a language pair
pub fn glossary_link(source_language: &str, target_language: &str) -> String {
    format!("/glossary?source={}&target={}", source_language, target_language)
}

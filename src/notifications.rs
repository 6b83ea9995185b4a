/*!
 * User notifications emitted by the background runners.
 *
 * Delivery is an external concern: the runners only see the `Notifier` trait
 * and swallow its failures. Two sinks ship with the crate, one storing
 * notifications in the database and one writing them to the log.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info, warn};
use std::sync::Arc;

use crate::database::Repository;
pub use crate::database::models::NotificationKind;

/// A message for the user who started a job
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Deep link into the application, if any
    pub link: Option<String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            link: None,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, title, message)
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification to a user
    async fn notify(&self, user_id: &str, notification: Notification) -> Result<()>;
}

/// Stores notifications in the `notifications` table
#[derive(Clone)]
pub struct RepositoryNotifier {
    repo: Repository,
}

impl RepositoryNotifier {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Notifier for RepositoryNotifier {
    async fn notify(&self, user_id: &str, notification: Notification) -> Result<()> {
        self.repo
            .insert_notification(
                user_id,
                notification.kind,
                &notification.title,
                &notification.message,
                notification.link.as_deref(),
            )
            .await?;
        Ok(())
    }
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str, notification: Notification) -> Result<()> {
        let line = format!("[{}] {}: {}", user_id, notification.title, notification.message);
        match notification.kind {
            NotificationKind::Info | NotificationKind::Success => info!("{}", line),
            NotificationKind::Warning => warn!("{}", line),
            NotificationKind::Error => error!("{}", line),
        }
        Ok(())
    }
}

/// Delivers to several sinks; every sink is tried even if an earlier one fails
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, user_id: &str, notification: Notification) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(user_id, notification.clone()).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

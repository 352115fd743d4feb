//! Best-effort side channel for change alerts.
//!
//! Delivery runs on its own task. A failed alert is logged and dropped; it
//! never reaches the caller and never undoes the write that triggered it.

pub mod activity;
pub mod message;
pub mod telegram;

pub use activity::{ACTIVITY_PATH, ActivityEntry, ActivityLog};
pub use telegram::TelegramSink;

use crate::core::Result;
use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str {
        "sink"
    }

    async fn send(&self, text: &str) -> Result<()>;
}

/// Handle on a spawned delivery. Dropping it does not cancel the delivery.
#[derive(Debug, Default)]
pub struct Delivery(Option<JoinHandle<()>>);

impl Delivery {
    pub fn skipped() -> Self {
        Self(None)
    }

    /// Wait until the delivery attempt is over, whatever its result.
    pub async fn finished(self) {
        if let Some(handle) = self.0 {
            let _ = handle.await;
        }
    }
}

#[derive(Clone)]
pub struct ChangeNotifier {
    sink: Option<Arc<dyn NotificationSink>>,
    activity: Option<ActivityLog>,
    /// Deliveries spawned and not yet finished, shared by all clones
    in_flight: Arc<watch::Sender<usize>>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self {
            sink: None,
            activity: None,
            in_flight: Arc::new(watch::Sender::new(0)),
        }
    }
}

impl ChangeNotifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Also append every content change to the activity log.
    pub fn with_activity_log(mut self, log: ActivityLog) -> Self {
        self.activity = Some(log);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Send `text` in the background.
    pub fn notify(&self, text: String) -> Delivery {
        let Some(sink) = self.sink.clone() else {
            log::debug!("notifications disabled, dropping alert");
            return Delivery::skipped();
        };
        self.spawn_detached(async move {
            if let Err(err) = sink.send(&text).await {
                log::warn!("failed to deliver alert via {}: {}", sink.name(), err);
            }
        })
    }

    /// Alert about an admin content change and record it in the activity log.
    pub fn content_changed(&self, section: &str, action: &str) -> Delivery {
        if self.sink.is_none() && self.activity.is_none() {
            return Delivery::skipped();
        }
        let sink = self.sink.clone();
        let activity = self.activity.clone();
        let section = section.to_string();
        let action = action.to_string();
        self.spawn_detached(async move {
            if let Some(sink) = sink {
                let text = message::content_change_alert(&section, &action, Local::now());
                if let Err(err) = sink.send(&text).await {
                    log::warn!("failed to deliver alert via {}: {}", sink.name(), err);
                }
            }
            if let Some(activity) = activity {
                if let Err(err) = activity.record(&section, &action).await {
                    log::warn!("failed to record activity for {}: {}", section, err);
                }
            }
        })
    }

    /// Wait until every delivery spawned through this notifier (or a clone) is over.
    pub async fn flush(&self) {
        let mut pending = self.in_flight.subscribe();
        let _ = pending.wait_for(|count| *count == 0).await;
    }

    fn spawn_detached<F>(&self, task: F) -> Delivery
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::warn!("no async runtime available, alert dropped");
            return Delivery::skipped();
        };
        let in_flight = self.in_flight.clone();
        in_flight.send_modify(|count| *count += 1);
        Delivery(Some(handle.spawn(async move {
            task.await;
            in_flight.send_modify(|count| *count = count.saturating_sub(1));
        })))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::core::CmsError;
    use std::sync::Mutex;

    /// Keeps every alert it is given; can be told to fail instead.
    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl RecordingSink {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, text: &str) -> Result<()> {
            if self.fail {
                return Err(CmsError::Notification("sink offline".into()));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }
}

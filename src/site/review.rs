use super::gate::SubmissionGate;
use super::{alert_time, required};
use crate::collection::{ORDER_FIELD, TIMESTAMP_FIELD};
use crate::core::{CmsError, Fields, RecordKey, Result, SharedClock, StorePath};
use crate::notify::{ChangeNotifier, message};
use crate::storage::SharedStore;
use serde_json::Value;
use std::time::Duration;

pub const REVIEWS_PATH: &str = "reviews";
pub const REVIEW_COOLDOWN_MESSAGE: &str = "Please wait a minute before submitting another review.";

const MAX_USERNAME_CHARS: usize = 50;
const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct ReviewSubmission {
    pub username: String,
    pub rating: u8,
    pub description: String,
}

/// The public review form of one visitor session.
///
/// New reviews are ranked by their submission time, which places them after
/// every review an admin has renumbered.
pub struct ReviewForm {
    store: SharedStore,
    notifier: ChangeNotifier,
    gate: SubmissionGate,
    path: StorePath,
}

impl ReviewForm {
    pub fn new(
        store: SharedStore,
        notifier: ChangeNotifier,
        clock: SharedClock,
        cooldown: Duration,
    ) -> Result<Self> {
        Ok(Self {
            store,
            notifier,
            gate: SubmissionGate::new(clock, cooldown, REVIEW_COOLDOWN_MESSAGE),
            path: StorePath::parse(REVIEWS_PATH)?,
        })
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    pub async fn submit(&mut self, submission: ReviewSubmission) -> Result<RecordKey> {
        let now = self.gate.now_millis();
        self.gate.check(now)?;

        let username = required("username", &submission.username, Some(MAX_USERNAME_CHARS))?;
        let description = required("description", &submission.description, Some(MAX_DESCRIPTION_CHARS))?;
        if !(1..=5).contains(&submission.rating) {
            return Err(CmsError::Validation("rating must be between 1 and 5".into()));
        }

        let mut fields = Fields::new();
        fields.insert("username".into(), Value::from(username.as_str()));
        fields.insert("rating".into(), Value::from(submission.rating));
        fields.insert("description".into(), Value::from(description));
        fields.insert(ORDER_FIELD.into(), Value::from(now));
        fields.insert(TIMESTAMP_FIELD.into(), Value::from(now));

        let key = self
            .store
            .append_record(&self.path, fields)
            .map_err(CmsError::into_store_write)?
            .durable()
            .await
            .map_err(CmsError::into_store_write)?;
        self.gate.record_success(now);

        self.notifier.notify(message::review_submission_alert(
            &username,
            submission.rating,
            alert_time(now),
        ));
        Ok(key)
    }
}

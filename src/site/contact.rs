use super::gate::SubmissionGate;
use super::{alert_time, required};
use crate::core::{CmsError, Fields, RecordKey, Result, SharedClock, StorePath, is_email};
use crate::editor::CONTACTS_PATH;
use crate::notify::{ChangeNotifier, message};
use crate::storage::SharedStore;
use serde_json::Value;
use std::time::Duration;

pub const CONTACT_COOLDOWN_MESSAGE: &str = "Please wait a minute before submitting another message.";

const MAX_NAME_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub description: String,
}

/// The public "Get In Touch" form of one visitor session.
pub struct ContactForm {
    store: SharedStore,
    notifier: ChangeNotifier,
    gate: SubmissionGate,
    path: StorePath,
}

impl ContactForm {
    pub fn new(
        store: SharedStore,
        notifier: ChangeNotifier,
        clock: SharedClock,
        cooldown: Duration,
    ) -> Result<Self> {
        Ok(Self {
            store,
            notifier,
            gate: SubmissionGate::new(clock, cooldown, CONTACT_COOLDOWN_MESSAGE),
            path: StorePath::parse(CONTACTS_PATH)?,
        })
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    pub async fn submit(&mut self, submission: ContactSubmission) -> Result<RecordKey> {
        let now = self.gate.now_millis();
        self.gate.check(now)?;

        let name = required("name", &submission.name, Some(MAX_NAME_CHARS))?;
        let email = required("email", &submission.email, None)?;
        let phone = required("phone", &submission.phone, None)?;
        let description = required("description", &submission.description, Some(MAX_DESCRIPTION_CHARS))?;
        if !is_email(&email) {
            return Err(CmsError::Validation("Please enter a valid email address.".into()));
        }

        let mut fields = Fields::new();
        fields.insert("name".into(), Value::from(name.as_str()));
        fields.insert("email".into(), Value::from(email.as_str()));
        fields.insert("phone".into(), Value::from(phone.as_str()));
        fields.insert("description".into(), Value::from(description));
        fields.insert("timestamp".into(), Value::from(now));

        let key = self
            .store
            .append_record(&self.path, fields)
            .map_err(CmsError::into_store_write)?
            .durable()
            .await
            .map_err(CmsError::into_store_write)?;
        self.gate.record_success(now);

        self.notifier
            .notify(message::contact_submission_alert(&name, &email, &phone, alert_time(now)));
        Ok(key)
    }
}

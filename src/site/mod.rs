//! Public submission forms.

pub mod contact;
pub mod gate;
pub mod review;

pub use contact::{CONTACT_COOLDOWN_MESSAGE, ContactForm, ContactSubmission};
pub use gate::SubmissionGate;
pub use review::{REVIEW_COOLDOWN_MESSAGE, REVIEWS_PATH, ReviewForm, ReviewSubmission};

use crate::core::{CmsError, Result};
use chrono::{DateTime, Local, TimeZone};

/// Trim `value`, reject it when empty and reject it when over `max_chars`.
fn required(field: &str, value: &str, max_chars: Option<usize>) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CmsError::Validation(format!("{} is required", field)));
    }
    if let Some(max) = max_chars {
        if value.chars().count() > max {
            return Err(CmsError::Validation(format!(
                "{} must be at most {} characters",
                field, max
            )));
        }
    }
    Ok(value.to_string())
}

fn alert_time(millis: i64) -> DateTime<Local> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Local::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ManualClock, StorePath};
    use crate::notify::ChangeNotifier;
    use crate::storage::{InMemoryStore, KeyedRecordStore};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn contact() -> ContactSubmission {
        ContactSubmission {
            name: "  Dana ".into(),
            email: "dana@example.com".into(),
            phone: "+1 555 0100".into(),
            description: "Need a logo".into(),
        }
    }

    #[tokio::test]
    async fn second_contact_within_cooldown_writes_nothing() {
        let store = InMemoryStore::new();
        let clock = ManualClock::starting_at(1_700_000_000_000);
        let mut form = ContactForm::new(
            Arc::new(store.clone()),
            ChangeNotifier::disabled(),
            Arc::new(clock.clone()),
            Duration::from_secs(60),
        )
        .unwrap();

        let key = form.submit(contact()).await.unwrap();
        clock.advance_secs(10);
        let err = form.submit(contact()).await.unwrap_err();
        assert_eq!(err.to_string(), CONTACT_COOLDOWN_MESSAGE);

        let stored = store.read_tree(&StorePath::parse("contacts").unwrap()).await.unwrap().unwrap();
        let stored = stored.as_object().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[key.as_str()]["name"], json!("Dana"));
        assert_eq!(stored[key.as_str()]["timestamp"], json!(1_700_000_000_000i64));

        clock.advance_secs(60);
        form.submit(contact()).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_input_does_not_start_the_cooldown() {
        let store = InMemoryStore::new();
        let mut form = ContactForm::new(
            Arc::new(store.clone()),
            ChangeNotifier::disabled(),
            Arc::new(ManualClock::starting_at(0)),
            Duration::from_secs(60),
        )
        .unwrap();

        let bad = ContactSubmission {
            email: "not-an-email".into(),
            ..contact()
        };
        assert!(matches!(form.submit(bad).await, Err(CmsError::Validation(_))));
        let long = ContactSubmission {
            name: "n".repeat(101),
            ..contact()
        };
        assert!(matches!(form.submit(long).await, Err(CmsError::Validation(_))));
        form.submit(contact()).await.unwrap();
    }

    #[tokio::test]
    async fn review_uses_submission_time_as_rank() {
        let store = InMemoryStore::new();
        let mut form = ReviewForm::new(
            Arc::new(store.clone()),
            ChangeNotifier::disabled(),
            Arc::new(ManualClock::starting_at(42_000)),
            Duration::from_secs(60),
        )
        .unwrap();

        let key = form
            .submit(ReviewSubmission {
                username: "ana".into(),
                rating: 5,
                description: "Sharp work".into(),
            })
            .await
            .unwrap();

        let stored = store.read_tree(&StorePath::parse("reviews").unwrap()).await.unwrap().unwrap();
        assert_eq!(stored[key.as_str()]["order"], json!(42_000));
        assert_eq!(stored[key.as_str()]["timestamp"], json!(42_000));

        let err = form
            .submit(ReviewSubmission {
                username: "ana".into(),
                rating: 4,
                description: "again".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), REVIEW_COOLDOWN_MESSAGE);
    }

    #[tokio::test]
    async fn review_rating_out_of_range_is_rejected() {
        let mut form = ReviewForm::new(
            Arc::new(InMemoryStore::new()),
            ChangeNotifier::disabled(),
            Arc::new(ManualClock::starting_at(0)),
            Duration::from_secs(60),
        )
        .unwrap();
        let result = form
            .submit(ReviewSubmission {
                username: "ana".into(),
                rating: 6,
                description: "x".into(),
            })
            .await;
        assert!(matches!(result, Err(CmsError::Validation(_))));
    }
}

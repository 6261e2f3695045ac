//! Reminder delivery over email and push
//!
//! Failures are logged and reported as `false`; nothing here retries.

use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::email::{EmailError, EmailSender};
use super::fcm_client::{PushError, PushMessage, PushSender};
use super::templates::{reminder_email, reminder_push};
use crate::db::users;

#[derive(Clone)]
pub struct Notifier {
    db: SqlitePool,
    email: Arc<dyn EmailSender>,
    push: Option<Arc<dyn PushSender>>,
}

impl Notifier {
    pub fn new(db: SqlitePool, email: Arc<dyn EmailSender>, push: Option<Arc<dyn PushSender>>) -> Self {
        Self { db, email, push }
    }

    pub fn push_enabled(&self) -> bool {
        self.push.is_some()
    }

    pub async fn send_reminder_email(
        &self,
        to: &str,
        medicine_name: &str,
        dosage: &str,
        timing: &str,
    ) -> bool {
        let message = reminder_email(to, medicine_name, dosage, timing);
        match self.email.send(&message).await {
            Ok(id) => {
                info!(to, message_id = %id, "Reminder email sent");
                true
            }
            Err(EmailError::Disabled) => false,
            Err(e) => {
                error!(to, "Reminder email failed: {}", e);
                false
            }
        }
    }

    /// Send a reminder push; an invalid token is removed from the user record
    pub async fn send_reminder_push(
        &self,
        user_id: &str,
        token: &str,
        medicine_name: &str,
        dosage: &str,
        timing: &str,
    ) -> bool {
        let Some(push) = self.push.as_ref() else {
            return false;
        };

        let content = reminder_push(medicine_name, dosage, timing);
        let message = PushMessage {
            token: token.to_string(),
            title: content.title,
            body: content.body,
            data: content.data,
        };

        match push.send(&message).await {
            Ok(_) => {
                info!(user_id, token = %token_preview(token), "Reminder push sent");
                true
            }
            Err(PushError::InvalidToken) => {
                warn!(user_id, token = %token_preview(token), "Push token invalid or expired, clearing");
                if let Err(e) = users::clear_fcm_token(&self.db, user_id, token).await {
                    error!(user_id, "Failed to clear invalid push token: {}", e);
                }
                false
            }
            Err(e) => {
                error!(user_id, "Reminder push failed: {}", e);
                false
            }
        }
    }
}

fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(20).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use medimind_common::db::init_memory_database;
    use std::sync::Mutex;

    use crate::services::email::EmailMessage;

    #[derive(Default)]
    struct RecordingEmail {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for RecordingEmail {
        async fn send(&self, message: &EmailMessage) -> Result<String, EmailError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok("msg-1".into())
        }
    }

    struct RejectingPush;

    #[async_trait]
    impl PushSender for RejectingPush {
        async fn send(&self, _message: &PushMessage) -> Result<String, PushError> {
            Err(PushError::InvalidToken)
        }
    }

    #[tokio::test]
    async fn test_email_uses_reminder_template() {
        let pool = init_memory_database().await.unwrap();
        let email = Arc::new(RecordingEmail::default());
        let notifier = Notifier::new(pool, email.clone(), None);

        assert!(notifier.send_reminder_email("a@b.co", "Aspirin", "75mg", "night").await);
        let sent = email.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "MediMind — Night Reminder: Aspirin");
    }

    #[tokio::test]
    async fn test_push_without_sender_is_not_sent() {
        let pool = init_memory_database().await.unwrap();
        let notifier = Notifier::new(pool, Arc::new(RecordingEmail::default()), None);
        assert!(!notifier.push_enabled());
        assert!(!notifier.send_reminder_push("u", "tok", "X", "1", "morning").await);
    }

    #[tokio::test]
    async fn test_invalid_token_is_cleared() {
        let pool = init_memory_database().await.unwrap();
        let now = Utc::now();
        let user = users::insert_user(&pool, "p@q.co", "hash", "P", now).await.unwrap();
        users::set_fcm_token(&pool, &user.id, "stale-token", now).await.unwrap();

        let notifier = Notifier::new(
            pool.clone(),
            Arc::new(RecordingEmail::default()),
            Some(Arc::new(RejectingPush)),
        );
        assert!(!notifier.send_reminder_push(&user.id, "stale-token", "X", "1", "morning").await);

        let reloaded = users::find_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert!(reloaded.fcm_token.is_none());
    }
}

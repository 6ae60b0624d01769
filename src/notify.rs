//! Asynchronous course-update notifications.
//!
//! Handlers resolve the recipients up front and enqueue one email job per
//! subscriber; a background worker drains the queue and talks to the mail
//! transport.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::clients::Mailer;
use crate::db::Store;
use crate::entities::courses;

pub const COURSE_UPDATED_SUBJECT: &str = "Курс обновлен";

#[derive(Debug, Clone)]
pub enum NotificationTask {
    SendEmail {
        to: String,
        subject: String,
        body: String,
    },
}

/// Handle used by the API layer to enqueue work.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<NotificationTask>,
    store: Store,
}

impl Notifier {
    /// Fan out one email job per current subscriber of the course. The
    /// recipient list and the body are fixed here, so a user subscribing
    /// after the update is not notified about it. Failures are logged and
    /// never surface to the caller.
    pub async fn course_updated(&self, course: &courses::Model) {
        let emails = match self.store.subscriber_emails(course.id).await {
            Ok(emails) => emails,
            Err(err) => {
                error!(
                    "Failed to resolve subscribers of course {}: {err}",
                    course.id
                );
                return;
            }
        };

        let body = format!("Материалы курса \"{}\" обновились.", course.name);

        let mut queued = 0usize;
        for to in emails {
            let task = NotificationTask::SendEmail {
                to,
                subject: COURSE_UPDATED_SUBJECT.to_string(),
                body: body.clone(),
            };
            if self.tx.send(task).is_err() {
                warn!(
                    "Notification worker is gone, dropping jobs for course {}",
                    course.id
                );
                return;
            }
            queued += 1;
        }

        if queued > 0 {
            info!("Course {} update: queued {queued} notification jobs", course.id);
        }
    }
}

/// Spawn the worker and return the enqueue handle. The worker runs until
/// every `Notifier` clone is dropped.
pub fn start_worker(store: Store, mailer: Arc<dyn Mailer>) -> Notifier {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(task) = rx.recv().await {
            match task {
                NotificationTask::SendEmail { to, subject, body } => {
                    // One bad address must not starve the rest of the queue.
                    if let Err(err) = mailer.send(&to, &subject, &body).await {
                        error!("Failed to mail {to}: {err}");
                    }
                }
            }
        }
    });

    Notifier { tx, store }
}

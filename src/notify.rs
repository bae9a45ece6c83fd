//! Operator and submitter notifications
//!
//! Delivery is fire-and-forget: callers go through the `send_*` helpers,
//! which log a failed delivery and carry on.

use tracing::{info, warn};

use crate::config::NotificationConfig;
use crate::error::NotifyError;
use crate::state::SubmissionState;

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn processing_started(&self, project_key: &str, recipients: &[String])
    -> Result<(), NotifyError>;

    fn validated(
        &self,
        release: &str,
        project_key: &str,
        state: SubmissionState,
        recipients: &[String],
    ) -> Result<(), NotifyError>;

    /// Alerts support staff to an unexpected scheduler failure.
    fn support_problem(&self, subject: &str, detail: &str) -> Result<(), NotifyError>;
}

pub fn send_processing_started(notifier: &dyn Notifier, project_key: &str, recipients: &[String]) {
    if let Err(e) = notifier.processing_started(project_key, recipients) {
        warn!(project_key, error = %e, "Failed to send processing started notification");
    }
}

pub fn send_validated(
    notifier: &dyn Notifier,
    release: &str,
    project_key: &str,
    state: SubmissionState,
    recipients: &[String],
) {
    if let Err(e) = notifier.validated(release, project_key, state, recipients) {
        warn!(project_key, %state, error = %e, "Failed to send validation notification");
    }
}

pub fn send_support_problem(notifier: &dyn Notifier, subject: &str, detail: &str) {
    if let Err(e) = notifier.support_problem(subject, detail) {
        warn!(subject, error = %e, "Failed to send support notification");
    }
}

/// Notifier that writes every notification to the log
pub struct TracingNotifier {
    enabled: bool,
    support_recipients: Vec<String>,
}

impl TracingNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            support_recipients: config.support_recipients.clone(),
        }
    }
}

impl Notifier for TracingNotifier {
    fn processing_started(
        &self,
        project_key: &str,
        recipients: &[String],
    ) -> Result<(), NotifyError> {
        if self.enabled {
            info!(project_key, recipients = ?recipients, "Validation started");
        }
        Ok(())
    }

    fn validated(
        &self,
        release: &str,
        project_key: &str,
        state: SubmissionState,
        recipients: &[String],
    ) -> Result<(), NotifyError> {
        if self.enabled {
            info!(release, project_key, %state, recipients = ?recipients, "Validation finished");
        }
        Ok(())
    }

    fn support_problem(&self, subject: &str, detail: &str) -> Result<(), NotifyError> {
        if self.enabled {
            warn!(subject, detail, recipients = ?self.support_recipients, "Support problem");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[test]
    fn test_delivery_failure_is_swallowed() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_validated()
            .with(
                eq("release1"),
                eq("PRJ1"),
                eq(SubmissionState::Valid),
                always(),
            )
            .times(1)
            .returning(|_, _, _, _| {
                Err(NotifyError::Delivery {
                    details: "smtp down".to_string(),
                })
            });

        send_validated(&notifier, "release1", "PRJ1", SubmissionState::Valid, &[]);
    }

    #[test]
    fn test_processing_started_is_forwarded() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_processing_started()
            .with(eq("PRJ1"), always())
            .times(1)
            .returning(|_, _| Ok(()));

        send_processing_started(&notifier, "PRJ1", &["a@example.org".to_string()]);
    }

    #[test]
    fn test_tracing_notifier_never_fails() {
        let notifier = TracingNotifier::new(&NotificationConfig::default());
        assert!(notifier.processing_started("PRJ1", &[]).is_ok());
        assert!(
            notifier
                .validated("release1", "PRJ1", SubmissionState::Invalid, &[])
                .is_ok()
        );
        assert!(notifier.support_problem("subject", "detail").is_ok());
    }
}
